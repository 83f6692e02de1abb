//! Lightning payment formats: BOLT11 invoices, LNURL and lightning
//! addresses.

pub mod address;
pub mod invoice;
pub mod lnurl;

pub use address::validate_lightning_address;
pub use invoice::{validate_invoice, validate_invoice_at, DecodedInvoice, Invoice};
pub use lnurl::{lnurl_decode, lnurl_encode};
