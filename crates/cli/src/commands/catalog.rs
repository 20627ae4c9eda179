//! Catalog browsing commands.

use traft_core::ProductId;
use traft_storefront::catalog::Product;
use traft_storefront::error::Result;

use super::Context;

#[allow(clippy::print_stdout)]
pub async fn banners(ctx: &Context) -> Result<()> {
    let banners = ctx.catalog()?.banners().await?;
    if banners.is_empty() {
        println!("No active banners");
    }
    for banner in banners {
        println!("{}", banner.title.as_deref().unwrap_or("(untitled)"));
        if let Some(subtitle) = &banner.subtitle {
            println!("  {subtitle}");
        }
        if let (Some(text), Some(link)) = (&banner.cta_text, &banner.cta_link) {
            println!("  {text} -> {link}");
        }
    }
    Ok(())
}

pub async fn home(ctx: &Context) -> Result<()> {
    print_products(&ctx.catalog()?.home_products().await?);
    Ok(())
}

pub async fn products(ctx: &Context, page: u32, limit: u32) -> Result<()> {
    print_products(&ctx.catalog()?.products(page, limit).await?);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn product(ctx: &Context, id: &str) -> Result<()> {
    let product = ctx.catalog()?.product(&ProductId::new(id)).await?;

    println!("{}", product.name);
    println!("  Price: {}", price_label(&product));
    if let Some(category) = &product.category {
        println!("  Category: {category}");
    }
    if !product.sizes.is_empty() {
        println!("  Sizes: {}", product.sizes.join(", "));
    }
    if !product.colors.is_empty() {
        println!("  Colors: {}", product.colors.join(", "));
    }
    if product.quantity == 0 {
        println!("  Out of stock");
    } else {
        println!("  In stock: {}", product.quantity);
    }
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
    for feature in &product.features {
        println!("  - {feature}");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(ctx: &Context) -> Result<()> {
    for category in ctx.catalog()?.categories().await? {
        println!("{:<24} {}", category.name, category.listing_path());
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
    }
    for product in products {
        println!("{:<12} {:<32} {}", product.id, product.name, price_label(product));
    }
}

fn price_label(product: &Product) -> String {
    if product.is_discounted() {
        format!("{} (was {})", product.sale_price().display(), product.price.display())
    } else {
        product.sale_price().display()
    }
}
