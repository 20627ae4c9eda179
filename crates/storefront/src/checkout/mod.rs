//! Checkout session state machine.
//!
//! # States
//!
//! ```text
//! Empty ──open──▶ CollectingInfo ──proceed──▶ AwaitingPayment ──begin_submit──▶ Submitting
//!                      ▲                         │      ▲                          │    │
//!                      └──────────back───────────┘      └──set_transaction_ref──┐  │    │
//!                                                                               │  ▼    ▼
//!                                                                             Failed  Completed
//! ```
//!
//! The shopper leaves mid-flow to pay in a UPI app, which may kill this
//! process. Every transition into or within the payment step is persisted
//! through the [`KeyValueStore`], and [`CheckoutSession::restore`] puts the
//! shopper back where they were as long as the draft is younger than the
//! configured time-to-live (one hour by default).
//!
//! Submitting without a transaction reference is unrepresentable:
//! [`CheckoutState::Submitting`] holds a [`TransactionRef`], which cannot be
//! empty.

mod draft;
pub(crate) mod form;

pub use draft::{CheckoutDraft, CheckoutSessionState, DEFAULT_TTL};
pub use form::{Field, ShippingDetails, ShippingForm, ValidationErrors};

use std::fmt;

use chrono::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use traft_core::{
    CheckoutStep, DraftId, OrderId, PaymentMode, TransactionRef, TransactionRefError,
};

use crate::cart::{CartError, CartItem, CartStore};
use crate::clock::{Clock, SystemClock};
use crate::error::add_breadcrumb;
use crate::orders::{Order, OrderGateway, OrderSubmissionError};
use crate::payment_link::{DEFAULT_NOTE, PaymentLink, PaymentLinkError, build_link};
use crate::pricing::{PricingPolicy, Quote, subtotal};
use crate::storage::{KeyValueStore, StorageError, keys, load_json, save_json};

/// Errors from checkout transitions.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The action is not available in the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Checkout needs at least one cart item.
    #[error("your cart is empty")]
    EmptyCart,

    /// The cart no longer matches the totals the shopper paid against.
    #[error("your cart changed since the payment amount was set; please review your order")]
    CartChanged,

    /// One or more shipping fields are invalid.
    #[error("please correct the highlighted fields: {0}")]
    Validation(#[from] ValidationErrors),

    /// The transaction reference is missing or malformed.
    #[error(transparent)]
    TransactionRef(#[from] TransactionRefError),

    /// The payment link could not be built.
    #[error(transparent)]
    PaymentLink(#[from] PaymentLinkError),

    /// The order API rejected or did not receive the order.
    #[error("failed to place order: {0}")]
    Submission(#[from] OrderSubmissionError),

    /// Persisting checkout state failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Clearing the cart after a successful order failed.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Payee and pricing settings for a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub pricing: PricingPolicy,
    /// UPI virtual payment address receiving the money.
    pub payee_id: String,
    /// Name shown in the payment app.
    pub payee_name: String,
    /// Transaction note shown in the payment app.
    pub note: String,
    /// How long a draft stays resumable.
    pub ttl: Duration,
}

impl CheckoutSettings {
    /// Settings with the default pricing, note and time-to-live.
    #[must_use]
    pub fn new(payee_id: impl Into<String>, payee_name: impl Into<String>) -> Self {
        Self {
            pricing: PricingPolicy::default(),
            payee_id: payee_id.into(),
            payee_name: payee_name.into(),
            note: DEFAULT_NOTE.to_string(),
            ttl: DEFAULT_TTL,
        }
    }
}

/// The draft and link of a checkout that has reached the payment step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStage {
    pub draft: CheckoutDraft,
    pub link: PaymentLink,
}

/// Where the shopper is in checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// Nothing to check out.
    Empty,
    /// Filling in shipping details and choosing a payment mode.
    CollectingInfo {
        form: ShippingForm,
        payment_mode: PaymentMode,
        /// Kept when the shopper steps back from the payment screen.
        transaction_ref: String,
    },
    /// Payment link shown; waiting for the transaction reference.
    AwaitingPayment {
        stage: PaymentStage,
        /// As typed; submission stays disabled while it is blank.
        transaction_ref: String,
    },
    /// The create-order request is in flight.
    Submitting {
        stage: PaymentStage,
        transaction_ref: TransactionRef,
    },
    /// The order was created; cart and checkout records are gone.
    Completed { order_id: OrderId },
    /// The last submission failed; everything needed to retry is kept.
    Failed {
        stage: PaymentStage,
        transaction_ref: TransactionRef,
        reason: String,
    },
}

impl CheckoutState {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::CollectingInfo { .. } => "collecting info",
            Self::AwaitingPayment { .. } => "awaiting payment",
            Self::Submitting { .. } => "submitting",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An order ready to send, produced by [`CheckoutSession::begin_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub order: Order,
    /// Idempotency key for the create-order call.
    pub draft_id: DraftId,
}

/// Drives one shopper's checkout.
///
/// Owns the [`keys::PENDING_CHECKOUT`] and [`keys::CHECKOUT_SESSION`]
/// records; the cart is borrowed per call.
#[derive(Debug)]
pub struct CheckoutSession<S, C = SystemClock> {
    store: S,
    clock: C,
    settings: CheckoutSettings,
    state: CheckoutState,
}

impl<S: KeyValueStore, C: Clock> CheckoutSession<S, C> {
    /// Start a session, resuming any unexpired checkout found in `store`.
    ///
    /// - No draft: [`CheckoutState::Empty`]
    /// - Draft older than the time-to-live: both records are deleted and the
    ///   session starts [`CheckoutState::Empty`]
    /// - Unreadable records: treated as absent and deleted
    /// - Otherwise the saved step, payment mode and transaction reference
    ///   are restored, and the payment link rebuilt for the payment step
    pub fn restore(store: S, clock: C, settings: CheckoutSettings) -> Self {
        let mut session = Self {
            store,
            clock,
            settings,
            state: CheckoutState::Empty,
        };
        session.state = session.load_state();
        info!(state = %session.state, "Checkout session restored");
        session
    }

    fn load_state(&self) -> CheckoutState {
        let draft = match load_json::<CheckoutDraft>(&self.store, keys::PENDING_CHECKOUT) {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                self.discard_records("no pending draft");
                return CheckoutState::Empty;
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable checkout draft");
                self.discard_records("corrupt draft");
                return CheckoutState::Empty;
            }
        };

        if draft.is_expired(self.clock.now(), self.settings.ttl) {
            info!(draft_id = %draft.id, "Checkout draft expired");
            self.discard_records("expired draft");
            return CheckoutState::Empty;
        }

        let saved = match load_json::<CheckoutSessionState>(&self.store, keys::CHECKOUT_SESSION) {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable checkout session state");
                self.discard_records("corrupt session state");
                return CheckoutState::Empty;
            }
        };

        let (step, payment_mode, transaction_ref) = saved.map_or_else(
            || (CheckoutStep::CollectingInfo, draft.payment_mode, String::new()),
            |s| (s.step, s.payment_mode, s.transaction_ref),
        );

        match step {
            CheckoutStep::CollectingInfo => CheckoutState::CollectingInfo {
                form: ShippingForm::from(&draft.shipping),
                payment_mode,
                transaction_ref,
            },
            CheckoutStep::AwaitingPayment => match self.link_for(&draft) {
                Ok(link) => CheckoutState::AwaitingPayment {
                    stage: PaymentStage { draft, link },
                    transaction_ref,
                },
                Err(e) => {
                    warn!(error = %e, "Cannot rebuild payment link for saved draft");
                    self.discard_records("unpayable draft");
                    CheckoutState::Empty
                }
            },
        }
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// The session's settings.
    #[must_use]
    pub const fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// The payment link, once the shopper has reached the payment step.
    #[must_use]
    pub const fn payment_link(&self) -> Option<&PaymentLink> {
        match &self.state {
            CheckoutState::AwaitingPayment { stage, .. }
            | CheckoutState::Submitting { stage, .. }
            | CheckoutState::Failed { stage, .. } => Some(&stage.link),
            _ => None,
        }
    }

    /// Totals to display.
    ///
    /// While collecting info these follow the live cart and selected mode;
    /// from the payment step on they are the draft's snapshot.
    #[must_use]
    pub fn quote(&self, items: &[CartItem]) -> Option<Quote> {
        match &self.state {
            CheckoutState::CollectingInfo { payment_mode, .. } => {
                Some(self.settings.pricing.quote(items, *payment_mode))
            }
            CheckoutState::AwaitingPayment { stage, .. }
            | CheckoutState::Submitting { stage, .. }
            | CheckoutState::Failed { stage, .. } => Some(stage.draft.quote),
            CheckoutState::Empty | CheckoutState::Completed { .. } => None,
        }
    }

    /// Returns `true` if the confirm-payment action is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        match &self.state {
            CheckoutState::AwaitingPayment {
                transaction_ref, ..
            } => TransactionRef::parse(transaction_ref).is_ok(),
            CheckoutState::Failed { .. } => true,
            _ => false,
        }
    }

    /// Enter checkout with the current cart.
    ///
    /// From `Empty` (or a finished checkout) this moves to `CollectingInfo`
    /// when the cart has items; any other state is left as it is.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] if there is nothing to buy.
    pub fn open(&mut self, items: &[CartItem]) -> Result<&CheckoutState, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if matches!(
            self.state,
            CheckoutState::Empty | CheckoutState::Completed { .. }
        ) {
            self.state = CheckoutState::CollectingInfo {
                form: ShippingForm::default(),
                payment_mode: PaymentMode::default(),
                transaction_ref: String::new(),
            };
            info!("Checkout opened");
        }
        Ok(&self.state)
    }

    /// Replace the shipping form contents.
    ///
    /// # Errors
    ///
    /// Only allowed while collecting info.
    pub fn update_form(&mut self, new_form: ShippingForm) -> Result<(), CheckoutError> {
        match &mut self.state {
            CheckoutState::CollectingInfo { form, .. } => {
                *form = new_form;
                Ok(())
            }
            other => Err(invalid("edit shipping details", other)),
        }
    }

    /// Choose a payment mode and return the recomputed totals.
    ///
    /// # Errors
    ///
    /// Only allowed while collecting info.
    pub fn select_payment_mode(
        &mut self,
        mode: PaymentMode,
        items: &[CartItem],
    ) -> Result<Quote, CheckoutError> {
        match &mut self.state {
            CheckoutState::CollectingInfo { payment_mode, .. } => {
                *payment_mode = mode;
                Ok(self.settings.pricing.quote(items, mode))
            }
            other => Err(invalid("change payment mode", other)),
        }
    }

    /// Submit the shipping form and move to the payment step.
    ///
    /// Validates the form, prices the cart, builds the payment link for the
    /// amount due now, and persists a fresh draft plus session state.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Validation`] with every failing field; the state
    ///   is unchanged
    /// - [`CheckoutError::EmptyCart`] if the cart is empty
    /// - [`CheckoutError::Storage`] if the draft cannot be saved
    pub fn proceed_to_payment(&mut self, items: &[CartItem]) -> Result<PaymentLink, CheckoutError> {
        let CheckoutState::CollectingInfo {
            form,
            payment_mode,
            transaction_ref,
        } = &self.state
        else {
            return Err(invalid("proceed to payment", &self.state));
        };
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let shipping = form.validate()?;
        let payment_mode = *payment_mode;
        let transaction_ref = transaction_ref.clone();

        let draft = CheckoutDraft {
            id: DraftId::generate(),
            shipping,
            payment_mode,
            quote: self.settings.pricing.quote(items, payment_mode),
            created_at: self.clock.now(),
        };
        let link = self.link_for(&draft)?;

        save_json(&self.store, keys::PENDING_CHECKOUT, &draft)?;
        self.save_session(CheckoutStep::AwaitingPayment, payment_mode, &transaction_ref)?;

        info!(
            draft_id = %draft.id,
            payment_mode = %payment_mode,
            amount = %link.amount(),
            "Checkout moved to payment"
        );
        add_breadcrumb(
            "checkout",
            "Proceeded to payment",
            Some(&[("payment_mode", payment_mode.as_str())]),
        );

        self.state = CheckoutState::AwaitingPayment {
            stage: PaymentStage {
                draft,
                link: link.clone(),
            },
            transaction_ref,
        };
        Ok(link)
    }

    /// Return from the payment step to the shipping form.
    ///
    /// Saved records are left untouched, so a reload still resumes at the
    /// payment step; the form is pre-filled from the draft.
    ///
    /// # Errors
    ///
    /// Only allowed while awaiting payment.
    pub fn back(&mut self) -> Result<(), CheckoutError> {
        match &self.state {
            CheckoutState::AwaitingPayment {
                stage,
                transaction_ref,
            } => {
                self.state = CheckoutState::CollectingInfo {
                    form: ShippingForm::from(&stage.draft.shipping),
                    payment_mode: stage.draft.payment_mode,
                    transaction_ref: transaction_ref.clone(),
                };
                Ok(())
            }
            other => Err(invalid("go back", other)),
        }
    }

    /// Record what the shopper typed as the transaction reference.
    ///
    /// Editing after a failed submission returns to `AwaitingPayment`.
    ///
    /// # Errors
    ///
    /// Only allowed while awaiting payment or after a failure.
    pub fn set_transaction_ref(&mut self, input: &str) -> Result<(), CheckoutError> {
        let stage = match &self.state {
            CheckoutState::AwaitingPayment { stage, .. } | CheckoutState::Failed { stage, .. } => {
                stage.clone()
            }
            other => return Err(invalid("enter a transaction ID", other)),
        };

        self.save_session(CheckoutStep::AwaitingPayment, stage.draft.payment_mode, input)?;
        self.state = CheckoutState::AwaitingPayment {
            stage,
            transaction_ref: input.to_owned(),
        };
        Ok(())
    }

    /// Start submitting: validates the transaction reference and cart, moves
    /// to `Submitting`, and returns the order to send.
    ///
    /// Also used to retry from `Failed`.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::TransactionRef`] if no reference was entered; the
    ///   state is unchanged
    /// - [`CheckoutError::CartChanged`] if the cart no longer matches the
    ///   draft's subtotal
    pub fn begin_submit(&mut self, items: &[CartItem]) -> Result<PendingSubmission, CheckoutError> {
        let (stage, transaction_ref) = match &self.state {
            CheckoutState::AwaitingPayment {
                stage,
                transaction_ref,
            } => (stage, TransactionRef::parse(transaction_ref)?),
            CheckoutState::Failed {
                stage,
                transaction_ref,
                ..
            } => (stage, transaction_ref.clone()),
            other => return Err(invalid("submit the order", other)),
        };

        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if subtotal(items) != stage.draft.quote.subtotal {
            return Err(CheckoutError::CartChanged);
        }

        let order = Order::assemble(&stage.draft, items, &transaction_ref);
        let pending = PendingSubmission {
            order,
            draft_id: stage.draft.id,
        };

        info!(draft_id = %pending.draft_id, "Submitting order");
        self.state = CheckoutState::Submitting {
            stage: stage.clone(),
            transaction_ref,
        };
        Ok(pending)
    }

    /// Finish a successful submission.
    ///
    /// The state becomes `Completed` even if cleanup fails, since the order
    /// exists either way.
    ///
    /// # Errors
    ///
    /// Only allowed while submitting; otherwise reports the first cleanup
    /// failure.
    pub fn complete<K: KeyValueStore>(
        &mut self,
        order_id: OrderId,
        cart: &mut CartStore<K>,
    ) -> Result<(), CheckoutError> {
        if !matches!(self.state, CheckoutState::Submitting { .. }) {
            return Err(invalid("complete the order", &self.state));
        }

        info!(order_id = %order_id, "Checkout completed");
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_id", order_id.as_str())]),
        );
        self.state = CheckoutState::Completed { order_id };

        let cart_result = cart.clear();
        let records_result = self.clear_records();
        cart_result?;
        records_result
    }

    /// Record a failed submission. Nothing is cleared.
    ///
    /// # Errors
    ///
    /// Only allowed while submitting.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), CheckoutError> {
        match &self.state {
            CheckoutState::Submitting {
                stage,
                transaction_ref,
            } => {
                let reason = reason.into();
                warn!(draft_id = %stage.draft.id, reason = %reason, "Order submission failed");
                self.state = CheckoutState::Failed {
                    stage: stage.clone(),
                    transaction_ref: transaction_ref.clone(),
                    reason,
                };
                Ok(())
            }
            other => Err(invalid("record a failure", other)),
        }
    }

    /// Submit the order through `gateway` and settle the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`begin_submit`](Self::begin_submit) error if submission
    /// cannot start, or [`CheckoutError::Submission`] after moving to
    /// `Failed`. Once the API has accepted the order this returns `Ok`, even
    /// if clearing the cart or the saved draft fails.
    pub async fn submit<G, K>(
        &mut self,
        gateway: &G,
        cart: &mut CartStore<K>,
    ) -> Result<OrderId, CheckoutError>
    where
        G: OrderGateway,
        K: KeyValueStore,
    {
        let pending = self.begin_submit(cart.list())?;
        match gateway.create_order(&pending.order, pending.draft_id).await {
            Ok(order_id) => {
                // Completed either way; cleanup errors are reported, not returned.
                if let Err(e) = self.complete(order_id.clone(), cart) {
                    error!(order_id = %order_id, error = %e, "Order placed but cleanup failed");
                    sentry::capture_error(&e);
                }
                Ok(order_id)
            }
            Err(e) => {
                self.fail(e.to_string())?;
                Err(e.into())
            }
        }
    }

    /// Abandon the checkout, deleting the saved draft and session.
    ///
    /// # Errors
    ///
    /// Not allowed while a submission is in flight.
    pub fn abandon(&mut self) -> Result<(), CheckoutError> {
        if matches!(self.state, CheckoutState::Submitting { .. }) {
            return Err(invalid("abandon checkout", &self.state));
        }
        self.clear_records()?;
        self.state = CheckoutState::Empty;
        info!("Checkout abandoned");
        Ok(())
    }

    fn link_for(&self, draft: &CheckoutDraft) -> Result<PaymentLink, PaymentLinkError> {
        build_link(
            draft.quote.advance_due,
            &self.settings.payee_id,
            &self.settings.payee_name,
            &self.settings.note,
        )
    }

    fn save_session(
        &self,
        step: CheckoutStep,
        payment_mode: PaymentMode,
        transaction_ref: &str,
    ) -> Result<(), StorageError> {
        let state = CheckoutSessionState {
            step,
            transaction_ref: transaction_ref.to_owned(),
            payment_mode,
            updated_at: self.clock.now(),
        };
        save_json(&self.store, keys::CHECKOUT_SESSION, &state)
    }

    fn clear_records(&self) -> Result<(), CheckoutError> {
        self.store.remove(keys::PENDING_CHECKOUT)?;
        self.store.remove(keys::CHECKOUT_SESSION)?;
        Ok(())
    }

    fn discard_records(&self, why: &str) {
        if let Err(e) = self.clear_records() {
            warn!(error = %e, reason = why, "Failed to discard checkout records");
        }
    }
}

fn invalid(action: &'static str, state: &CheckoutState) -> CheckoutError {
    CheckoutError::InvalidTransition {
        action,
        state: state.name(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use traft_core::{Money, ProductId};

    use super::*;
    use crate::cart::{CartProduct, Variant};
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use super::form::tests::valid_form;

    const START: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

    /// Gateway returning scripted results and recording what it was sent.
    struct ScriptedGateway {
        results: Mutex<Vec<Result<OrderId, OrderSubmissionError>>>,
        sent: Mutex<Vec<(Order, DraftId)>>,
    }

    impl ScriptedGateway {
        fn new(results: Vec<Result<OrderId, OrderSubmissionError>>) -> Self {
            Self {
                results: Mutex::new(results),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl OrderGateway for ScriptedGateway {
        async fn create_order(
            &self,
            order: &Order,
            idempotency_key: DraftId,
        ) -> Result<OrderId, OrderSubmissionError> {
            self.sent
                .lock()
                .unwrap()
                .push((order.clone(), idempotency_key));
            self.results.lock().unwrap().remove(0)
        }
    }

    fn server_error() -> OrderSubmissionError {
        OrderSubmissionError::Api {
            status: 500,
            message: "Internal Server Error".to_string(),
        }
    }

    struct Fixture {
        store: MemoryStore,
        clock: std::sync::Arc<ManualClock>,
        cart: CartStore<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = MemoryStore::new();
            let mut cart = CartStore::load(store.clone()).unwrap();
            let tee = CartProduct {
                id: ProductId::new("tee-1"),
                name: "Kasavu Tee".to_string(),
                unit_price: Money::from_rupees(500),
                max_qty: 5,
                sizes: vec!["M".to_string()],
                colors: Vec::new(),
                image: None,
            };
            cart.add(&tee, Variant::new(Some("M"), None)).unwrap();
            cart.add(&tee, Variant::new(Some("M"), None)).unwrap();
            Self {
                store,
                clock: std::sync::Arc::new(ManualClock::new(START)),
                cart,
            }
        }

        fn session(&self) -> CheckoutSession<MemoryStore, std::sync::Arc<ManualClock>> {
            CheckoutSession::restore(
                self.store.clone(),
                std::sync::Arc::clone(&self.clock),
                CheckoutSettings::new("traft@okaxis", "Traft"),
            )
        }

        /// A session that has reached the payment step.
        fn at_payment(
            &self,
            mode: PaymentMode,
        ) -> CheckoutSession<MemoryStore, std::sync::Arc<ManualClock>> {
            let mut session = self.session();
            session.open(self.cart.list()).unwrap();
            session.update_form(valid_form()).unwrap();
            session.select_payment_mode(mode, self.cart.list()).unwrap();
            session.proceed_to_payment(self.cart.list()).unwrap();
            session
        }
    }

    #[test]
    fn test_empty_cart_cannot_open() {
        let store = MemoryStore::new();
        let mut session =
            CheckoutSession::restore(store, SystemClock, CheckoutSettings::new("a@upi", "Traft"));
        assert!(matches!(session.open(&[]), Err(CheckoutError::EmptyCart)));
        assert_eq!(session.state(), &CheckoutState::Empty);
    }

    #[test]
    fn test_open_moves_to_collecting_info() {
        let fx = Fixture::new();
        let mut session = fx.session();
        session.open(fx.cart.list()).unwrap();
        assert!(matches!(
            session.state(),
            CheckoutState::CollectingInfo {
                payment_mode: PaymentMode::Online,
                ..
            }
        ));
    }

    #[test]
    fn test_switching_mode_recomputes_quote() {
        let fx = Fixture::new();
        let mut session = fx.session();
        session.open(fx.cart.list()).unwrap();

        let cod = session
            .select_payment_mode(PaymentMode::Cod, fx.cart.list())
            .unwrap();
        assert_eq!(cod.shipping, Money::from_rupees(100));
        assert_eq!(cod.delivery_estimate(), "Delivery in 7 days");
        assert_eq!(session.quote(fx.cart.list()), Some(cod));

        let online = session
            .select_payment_mode(PaymentMode::Online, fx.cart.list())
            .unwrap();
        assert_eq!(online.shipping, Money::ZERO);
    }

    #[test]
    fn test_invalid_form_blocks_payment() {
        let fx = Fixture::new();
        let mut session = fx.session();
        session.open(fx.cart.list()).unwrap();
        session
            .update_form(ShippingForm {
                pincode: "12".to_string(),
                ..valid_form()
            })
            .unwrap();

        let err = session.proceed_to_payment(fx.cart.list()).unwrap_err();
        let CheckoutError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.get(Field::Pincode).is_some());
        assert!(matches!(session.state(), CheckoutState::CollectingInfo { .. }));
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_none());
    }

    #[test]
    fn test_proceed_builds_link_for_amount_due_now() {
        let fx = Fixture::new();
        let online = fx.at_payment(PaymentMode::Online);
        assert_eq!(
            online.payment_link().unwrap().amount(),
            Money::from_rupees(1000)
        );

        let fx = Fixture::new();
        let cod = fx.at_payment(PaymentMode::Cod);
        let link = cod.payment_link().unwrap();
        assert_eq!(link.amount(), Money::from_rupees(100));
        assert!(link.as_str().starts_with("upi://pay?pa=traft%40okaxis&pn=Traft&am=100&"));
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_some());
        assert!(fx.store.get(keys::CHECKOUT_SESSION).unwrap().is_some());
    }

    #[test]
    fn test_submit_blocked_without_transaction_ref() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Online);
        assert!(!session.can_submit());

        let err = session.begin_submit(fx.cart.list()).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::TransactionRef(TransactionRefError::Empty)
        ));
        assert!(matches!(session.state(), CheckoutState::AwaitingPayment { .. }));

        session.set_transaction_ref("   ").unwrap();
        assert!(!session.can_submit());
        session.set_transaction_ref("UTR42").unwrap();
        assert!(session.can_submit());
    }

    #[tokio::test]
    async fn test_successful_submit_clears_everything() {
        let mut fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Cod);
        session.set_transaction_ref("UTR42").unwrap();

        let gateway = ScriptedGateway::new(vec![Ok(OrderId::new("ord-1"))]);
        let order_id = session.submit(&gateway, &mut fx.cart).await.unwrap();

        assert_eq!(order_id.as_str(), "ord-1");
        assert_eq!(
            session.state(),
            &CheckoutState::Completed {
                order_id: OrderId::new("ord-1")
            }
        );
        assert!(fx.cart.is_empty());
        assert!(fx.store.is_empty());

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent[0].0.transaction_id, "UTR42");
        assert_eq!(sent[0].0.products[0].quantity, 2);
    }

    /// Store whose deletes always fail.
    #[derive(Clone, Default)]
    struct UndeletableStore(MemoryStore);

    impl KeyValueStore for UndeletableStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[tokio::test]
    async fn test_cleanup_failure_after_order_is_still_success() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Online);
        session.set_transaction_ref("UTR77").unwrap();

        let stuck = UndeletableStore::default();
        let mut cart = CartStore::load(stuck.clone()).unwrap();
        for item in fx.cart.list() {
            let product = CartProduct {
                id: item.product_id.clone(),
                name: item.name.clone(),
                unit_price: item.unit_price,
                max_qty: item.max_qty,
                sizes: item.size.iter().cloned().collect(),
                colors: Vec::new(),
                image: None,
            };
            for _ in 0..item.quantity {
                cart.add(&product, Variant::new(item.size.as_deref(), None)).unwrap();
            }
        }

        let gateway = ScriptedGateway::new(vec![Ok(OrderId::new("ord-9"))]);
        let order_id = session.submit(&gateway, &mut cart).await.unwrap();

        assert_eq!(order_id.as_str(), "ord-9");
        assert!(matches!(session.state(), CheckoutState::Completed { .. }));
        assert!(stuck.get(keys::CART).unwrap().is_some());
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_state_for_retry() {
        let mut fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Cod);
        session.set_transaction_ref("UTR42").unwrap();

        let gateway = ScriptedGateway::new(vec![Err(server_error()), Ok(OrderId::new("ord-2"))]);
        let err = session.submit(&gateway, &mut fx.cart).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Submission(_)));

        let CheckoutState::Failed {
            transaction_ref,
            reason,
            ..
        } = session.state()
        else {
            panic!("expected failed state, got {}", session.state());
        };
        assert_eq!(transaction_ref.as_str(), "UTR42");
        assert!(reason.contains("500"));
        assert!(!fx.cart.is_empty());
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_some());
        assert!(fx.store.get(keys::CHECKOUT_SESSION).unwrap().is_some());
        assert!(session.can_submit());

        // Shopper corrects the reference and retries.
        session.set_transaction_ref("UTR43").unwrap();
        assert!(matches!(session.state(), CheckoutState::AwaitingPayment { .. }));
        let order_id = session.submit(&gateway, &mut fx.cart).await.unwrap();
        assert_eq!(order_id.as_str(), "ord-2");

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0.transaction_id, "UTR43");
        // Same draft, same idempotency key.
        assert_eq!(sent[0].1, sent[1].1);
    }

    #[test]
    fn test_submitting_state_rejects_other_actions() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Online);
        session.set_transaction_ref("UTR1").unwrap();
        session.begin_submit(fx.cart.list()).unwrap();

        assert!(matches!(session.state(), CheckoutState::Submitting { .. }));
        assert!(session.begin_submit(fx.cart.list()).is_err());
        assert!(session.back().is_err());
        assert!(session.abandon().is_err());
        assert!(session.set_transaction_ref("x").is_err());
    }

    #[test]
    fn test_cart_change_after_payment_is_detected() {
        let mut fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Online);
        session.set_transaction_ref("UTR1").unwrap();

        let key = fx.cart.list()[0].key();
        fx.cart.set_quantity(&key, 1).unwrap();
        assert!(matches!(
            session.begin_submit(fx.cart.list()),
            Err(CheckoutError::CartChanged)
        ));
    }

    #[test]
    fn test_back_keeps_form_and_saved_records() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Cod);
        session.set_transaction_ref("UTR7").unwrap();
        let saved_draft = fx.store.get(keys::PENDING_CHECKOUT).unwrap();
        let saved_session = fx.store.get(keys::CHECKOUT_SESSION).unwrap();

        session.back().unwrap();
        let CheckoutState::CollectingInfo {
            form,
            payment_mode,
            transaction_ref,
        } = session.state()
        else {
            panic!("expected collecting info");
        };
        assert_eq!(form.customer_name, "Anu Joseph");
        assert_eq!(*payment_mode, PaymentMode::Cod);
        assert_eq!(transaction_ref, "UTR7");
        assert_eq!(fx.store.get(keys::PENDING_CHECKOUT).unwrap(), saved_draft);
        assert_eq!(fx.store.get(keys::CHECKOUT_SESSION).unwrap(), saved_session);

        // Forward again: the reference typed earlier is still there.
        session.proceed_to_payment(fx.cart.list()).unwrap();
        assert!(session.can_submit());
    }

    #[test]
    fn test_restore_within_ttl() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Cod);
        session.set_transaction_ref("UTR9").unwrap();
        let before = session.state().clone();

        fx.clock.advance(Duration::minutes(59));
        let restored = fx.session();
        assert_eq!(restored.state(), &before);
        assert_eq!(restored.payment_link(), session.payment_link());
    }

    #[test]
    fn test_restore_after_ttl_discards() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Cod);
        session.set_transaction_ref("UTR9").unwrap();

        fx.clock.advance(Duration::minutes(61));
        let mut restored = fx.session();
        assert_eq!(restored.state(), &CheckoutState::Empty);
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_none());
        assert!(fx.store.get(keys::CHECKOUT_SESSION).unwrap().is_none());

        restored.open(fx.cart.list()).unwrap();
        let CheckoutState::CollectingInfo { form, .. } = restored.state() else {
            panic!("expected collecting info");
        };
        assert_eq!(form, &ShippingForm::default());
    }

    #[test]
    fn test_restore_is_idempotent() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Online);
        session.set_transaction_ref("UTR5").unwrap();

        let first = fx.session();
        let second = fx.session();
        assert_eq!(first.state(), second.state());
        assert_eq!(
            fx.store.get(keys::CHECKOUT_SESSION).unwrap(),
            fx.store.get(keys::CHECKOUT_SESSION).unwrap()
        );
    }

    #[test]
    fn test_restore_corrupt_records() {
        let fx = Fixture::new();
        fx.store.set(keys::PENDING_CHECKOUT, "{\"broken\":").unwrap();
        fx.store.set(keys::CHECKOUT_SESSION, "{}").unwrap();

        let session = fx.session();
        assert_eq!(session.state(), &CheckoutState::Empty);
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_none());
        assert!(fx.store.get(keys::CHECKOUT_SESSION).unwrap().is_none());
        // The cart is not touched.
        assert!(fx.store.get(keys::CART).unwrap().is_some());
    }

    #[test]
    fn test_restore_corrupt_session_state_only() {
        let fx = Fixture::new();
        let _ = fx.at_payment(PaymentMode::Online);
        fx.store.set(keys::CHECKOUT_SESSION, "[1,2,3]").unwrap();

        let session = fx.session();
        assert_eq!(session.state(), &CheckoutState::Empty);
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_none());
    }

    #[test]
    fn test_restore_rejects_edited_draft() {
        let fx = Fixture::new();
        let _ = fx.at_payment(PaymentMode::Cod);

        let raw = fx.store.get(keys::PENDING_CHECKOUT).unwrap().unwrap();
        let mut draft: serde_json::Value = serde_json::from_str(&raw).unwrap();
        draft["shipping"]["phoneNumber"] = "12345".into();
        fx.store
            .set(keys::PENDING_CHECKOUT, &draft.to_string())
            .unwrap();

        let session = fx.session();
        assert_eq!(session.state(), &CheckoutState::Empty);
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_none());
    }

    #[test]
    fn test_abandon_clears_records() {
        let fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Online);
        session.abandon().unwrap();
        assert_eq!(session.state(), &CheckoutState::Empty);
        assert!(fx.store.get(keys::PENDING_CHECKOUT).unwrap().is_none());
        assert!(fx.store.get(keys::CART).unwrap().is_some());
    }

    #[test]
    fn test_complete_requires_submitting() {
        let mut fx = Fixture::new();
        let mut session = fx.at_payment(PaymentMode::Online);
        assert!(matches!(
            session.complete(OrderId::new("x"), &mut fx.cart),
            Err(CheckoutError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.fail("boom"),
            Err(CheckoutError::InvalidTransition { .. })
        ));
    }
}
