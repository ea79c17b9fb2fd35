pub mod assembler;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod refund;
pub mod routing;
pub mod settlement;

pub use assembler::{CheckoutRequest, OrderAssembler};
pub use lifecycle::OrderManager;
pub use models::{
    Cart, CartItem, Order, OrderItem, OrderPartnerAssignment, OrderStatus, OrderView,
    PartnerOrderStatus, Refund, RefundStatus, Settlement, SettlementOrder, StatusHistory,
};
pub use orchestrator::OrderEngine;
pub use refund::{RefundCalculator, RefundLedger};
pub use routing::PartnerRouter;
pub use settlement::{CommissionConfig, PendingSettlement, SettlementEngine};
