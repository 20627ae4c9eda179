//! Checkout commands.
//!
//! A checkout spans several invocations: `pay` stores a draft and prints the
//! UPI link, the shopper pays in their app, then `txn` and `submit` finish
//! the order. Drafts expire after `TRAFT_CHECKOUT_TTL_MINUTES`.

use traft_core::PaymentMode;
use traft_storefront::checkout::{CheckoutError, CheckoutState, Field, ShippingForm};
use traft_storefront::error::Result;
use traft_storefront::pricing::Quote;

use super::Context;

/// Shipping fields given on the command line; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct FormPatch {
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub alternate_phone: Option<String>,
    pub instagram_id: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub landmark: Option<String>,
}

impl FormPatch {
    fn apply(self, form: &mut ShippingForm) {
        let fields = [
            (self.customer_name, &mut form.customer_name),
            (self.phone_number, &mut form.phone_number),
            (self.alternate_phone, &mut form.alternate_phone),
            (self.instagram_id, &mut form.instagram_id),
            (self.address, &mut form.address),
            (self.district, &mut form.district),
            (self.state, &mut form.state),
            (self.pincode, &mut form.pincode),
            (self.landmark, &mut form.landmark),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Show totals and delivery time for `mode` without starting checkout.
#[allow(clippy::print_stdout)]
pub fn quote(ctx: &Context, mode: PaymentMode) -> Result<()> {
    let cart = ctx.cart()?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }
    let session = ctx.session();
    print_quote(&session.settings().pricing.quote(cart.list(), mode));
    Ok(())
}

/// Validate shipping details, save the draft and print the payment link.
#[allow(clippy::print_stdout)]
pub fn pay(ctx: &Context, mode: Option<PaymentMode>, patch: FormPatch) -> Result<()> {
    let cart = ctx.cart()?;
    let mut session = ctx.session();

    // Re-running `pay` edits the saved details.
    if matches!(session.state(), CheckoutState::AwaitingPayment { .. }) {
        session.back()?;
    }
    session.open(cart.list())?;

    let (mut form, current_mode) = match session.state() {
        CheckoutState::CollectingInfo {
            form, payment_mode, ..
        } => (form.clone(), *payment_mode),
        _ => (ShippingForm::default(), PaymentMode::default()),
    };
    patch.apply(&mut form);
    session.update_form(form)?;
    session.select_payment_mode(mode.unwrap_or(current_mode), cart.list())?;

    let link = match session.proceed_to_payment(cart.list()) {
        Ok(link) => link,
        Err(CheckoutError::Validation(errors)) => {
            for (field, message) in errors.iter() {
                println!("  --{}: {message}", flag_for(field));
            }
            return Err(CheckoutError::Validation(errors).into());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(quote) = session.quote(cart.list()) {
        print_quote(&quote);
    }
    println!();
    println!("Pay {} with any UPI app:", link.amount().display());
    println!("  {link}");
    println!();
    println!("Then run: traft checkout txn <transaction ID>");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn set_txn(ctx: &Context, reference: &str) -> Result<()> {
    let mut session = ctx.session();
    session.set_transaction_ref(reference)?;
    if session.can_submit() {
        println!("Transaction ID saved. Run: traft checkout submit");
    } else {
        println!("Transaction ID cleared");
    }
    Ok(())
}

/// Place the order, optionally recording the transaction ID first.
#[allow(clippy::print_stdout)]
pub async fn submit(ctx: &Context, txn: Option<&str>) -> Result<()> {
    let mut cart = ctx.cart()?;
    let mut session = ctx.session();
    if let Some(txn) = txn {
        session.set_transaction_ref(txn)?;
    }

    let gateway = ctx.orders()?;
    let order_id = session.submit(&gateway, &mut cart).await?;
    println!("Order placed. Order ID: {order_id}");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn status(ctx: &Context) -> Result<()> {
    let cart = ctx.cart()?;
    let session = ctx.session();

    match session.state() {
        CheckoutState::Empty => println!("No checkout in progress"),
        CheckoutState::CollectingInfo { form, .. } => {
            println!("Entering shipping details for {}", form.customer_name);
        }
        CheckoutState::AwaitingPayment {
            stage,
            transaction_ref,
        } => {
            println!("Awaiting payment (started {})", stage.draft.created_at.format("%H:%M"));
            print_quote(&stage.draft.quote);
            println!("Link: {}", stage.link);
            if transaction_ref.trim().is_empty() {
                println!("Transaction ID: not entered");
            } else {
                println!("Transaction ID: {transaction_ref}");
            }
        }
        other => println!("Checkout is {other}"),
    }

    if !cart.is_empty() && !matches!(session.state(), CheckoutState::Empty) {
        println!("{} item(s) in cart", cart.item_count());
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn abandon(ctx: &Context) -> Result<()> {
    ctx.session().abandon()?;
    println!("Checkout discarded; your cart is unchanged");
    Ok(())
}

/// The `pay` option that sets `field`.
const fn flag_for(field: Field) -> &'static str {
    match field {
        Field::CustomerName => "name",
        Field::PhoneNumber => "phone",
        Field::AlternatePhone => "alt-phone",
        Field::Address => "address",
        Field::District => "district",
        Field::State => "state",
        Field::Pincode => "pincode",
    }
}

#[allow(clippy::print_stdout)]
fn print_quote(quote: &Quote) {
    println!("Payment:   {}", quote.payment_mode.label());
    println!("Subtotal:  {}", quote.subtotal.display());
    println!("Shipping:  {}", quote.shipping.display());
    println!("Total:     {}", quote.total.display());
    if quote.payment_mode == PaymentMode::Cod {
        println!("Pay now:   {}", quote.advance_due.display());
        println!("On delivery: {}", quote.remaining_on_delivery.display());
    }
    println!("Delivery:  {}", quote.delivery_estimate());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_overrides_only_given_fields() {
        let mut form = ShippingForm {
            customer_name: "Anu Joseph".to_string(),
            pincode: "682001".to_string(),
            ..ShippingForm::default()
        };
        FormPatch {
            pincode: Some("682002".to_string()),
            landmark: Some("Near Metro".to_string()),
            ..FormPatch::default()
        }
        .apply(&mut form);

        assert_eq!(form.customer_name, "Anu Joseph");
        assert_eq!(form.pincode, "682002");
        assert_eq!(form.landmark, "Near Metro");
    }

    #[test]
    fn test_validation_errors_name_pay_flags() {
        let errors = ShippingForm::default().validate().unwrap_err();
        let flags: Vec<&str> = errors.iter().map(|(field, _)| flag_for(field)).collect();
        assert!(flags.contains(&"name"));
        assert!(flags.contains(&"phone"));
        assert!(flags.contains(&"pincode"));
        assert!(!flags.iter().any(|f| f.contains("Name") || f.contains("Number")));
    }

    #[test]
    fn test_every_flag_is_a_pay_option() {
        use clap::CommandFactory;

        let cli = crate::Cli::command();
        let pay = cli
            .find_subcommand("checkout")
            .and_then(|c| c.find_subcommand("pay"))
            .unwrap();
        for field in [
            Field::CustomerName,
            Field::PhoneNumber,
            Field::AlternatePhone,
            Field::Address,
            Field::District,
            Field::State,
            Field::Pincode,
        ] {
            let flag = flag_for(field);
            assert!(
                pay.get_arguments().any(|a| a.get_long() == Some(flag)),
                "no --{flag} option"
            );
        }
    }
}
