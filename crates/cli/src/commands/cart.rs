//! Cart commands.

use traft_core::ProductId;
use traft_storefront::cart::{AddOutcome, CartError, CartItem, CartKey, CartProduct, Variant};
use traft_storefront::error::Result;
use traft_storefront::pricing::subtotal;

use super::Context;

/// Fetch a product from the catalog and add one unit of it.
#[allow(clippy::print_stdout)]
pub async fn add(ctx: &Context, product_id: &str, size: Option<&str>, color: Option<&str>) -> Result<()> {
    let product = ctx.catalog()?.product(&ProductId::new(product_id)).await?;
    let mut cart = ctx.cart()?;

    match cart.add(&CartProduct::from(&product), Variant::new(size, color))? {
        AddOutcome::Added => println!("Added {} to cart", product.name),
        AddOutcome::Incremented(quantity) => {
            println!("{} is already in your cart, quantity now {quantity}", product.name);
        }
    }
    println!("Cart: {} item(s), subtotal {}", cart.item_count(), subtotal(cart.list()).display());
    Ok(())
}

/// Print every line with its number and the subtotal.
#[allow(clippy::print_stdout)]
pub fn list(ctx: &Context) -> Result<()> {
    let cart = ctx.cart()?;
    if cart.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }

    for (i, item) in cart.list().iter().enumerate() {
        println!("{:>3}. {}", i + 1, describe(item));
    }
    println!("Subtotal: {}", subtotal(cart.list()).display());
    Ok(())
}

pub fn set_quantity(ctx: &Context, line: usize, quantity: u32) -> Result<()> {
    let mut cart = ctx.cart()?;
    let key = line_key(cart.list(), line)?;
    cart.set_quantity(&key, quantity)?;
    list(ctx)
}

pub fn remove(ctx: &Context, line: usize) -> Result<()> {
    let mut cart = ctx.cart()?;
    let key = line_key(cart.list(), line)?;
    cart.remove(&key)?;
    list(ctx)
}

#[allow(clippy::print_stdout)]
pub fn clear(ctx: &Context) -> Result<()> {
    ctx.cart()?.clear()?;
    println!("Cart cleared");
    Ok(())
}

/// Key of the 1-based `line` shown by `cart list`.
fn line_key(items: &[CartItem], line: usize) -> std::result::Result<CartKey, CartError> {
    line.checked_sub(1)
        .and_then(|i| items.get(i))
        .map(CartItem::key)
        .ok_or(CartError::NotInCart)
}

fn describe(item: &CartItem) -> String {
    let variant: Vec<&str> = [item.size.as_deref(), item.color.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    let variant = if variant.is_empty() {
        String::new()
    } else {
        format!(" ({})", variant.join(", "))
    };
    format!(
        "{}{variant} x{} @ {} = {}",
        item.name,
        item.quantity,
        item.unit_price.display(),
        item.line_total().display()
    )
}
