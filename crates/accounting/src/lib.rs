//! Accounting domain module (shop expenses).

pub mod expense;

pub use expense::{
    CategoryTotal, Expense, ExpenseFilter, ExpenseSort, ExpenseSummary, NewExpense, UpdateExpense,
};
