//! Purchasing domain module (goods receive).
//!
//! A goods receive records stock arriving from a supplier. Persisting one
//! increases the stock of every product on it; deleting one reverses that.

pub mod goods_receive;

pub use goods_receive::{
    GoodsReceive, GoodsReceiveFilter, GoodsReceiveItem, GoodsReceiveSort, NewGoodsReceive,
    NewGoodsReceiveItem,
};
