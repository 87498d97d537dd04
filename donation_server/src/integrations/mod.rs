pub mod audit;
pub mod razorpay;
