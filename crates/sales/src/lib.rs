//! Sales domain module: stock outs (issued goods) and customer orders.

pub mod order;
pub mod stock_out;

pub use order::{NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, OrderSort, OrderStatus};
pub use stock_out::{
    NewStockOut, NewStockOutItem, StockOut, StockOutFilter, StockOutItem, StockOutSort,
};
