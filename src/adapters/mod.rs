pub mod razorpay;
pub mod traits;

#[cfg(test)]
pub mod fake;

pub use razorpay::{RazorpayConfig, RazorpayGateway};
pub use traits::{GatewayOrder, GatewayOrderRequest, OrderNotes, PaymentGateway};
