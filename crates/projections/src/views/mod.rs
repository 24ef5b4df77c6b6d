pub mod kitchen_board;
pub mod waiter_orders;

pub use kitchen_board::{KitchenBoardView, KitchenTicket};
pub use waiter_orders::{WaiterOrderSummary, WaiterOrdersView};
