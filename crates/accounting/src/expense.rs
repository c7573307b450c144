use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{optional_text, require_text};
use stockroom_core::{
    DateRange, DomainError, DomainResult, EmployeeId, Entity, ExpenseId, Money, SortDirection,
    SortField,
};

/// Money spent running the shop (rent, wages, utilities...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub category: String,
    pub amount: Money,
    pub spent_on: NaiveDate,
    pub note: Option<String>,
    pub recorded_by: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Expense {
    type Id = ExpenseId;

    fn id(&self) -> ExpenseId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewExpense {
    pub category: String,
    pub amount: i64,
    #[serde(default)]
    pub spent_on: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateExpense {
    pub category: Option<String>,
    pub amount: Option<i64>,
    pub spent_on: Option<NaiveDate>,
    pub note: Option<String>,
}

fn positive_amount(minor: i64) -> DomainResult<Money> {
    if minor <= 0 {
        return Err(DomainError::validation("amount", "must be positive"));
    }
    Ok(Money::from_minor(minor))
}

impl Expense {
    pub fn create(
        input: NewExpense,
        recorded_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: ExpenseId::new(),
            category: require_text("category", &input.category)?,
            amount: positive_amount(input.amount)?,
            spent_on: input.spent_on.unwrap_or_else(|| now.date_naive()),
            note: optional_text(input.note),
            recorded_by,
            created_at: now,
        })
    }

    /// Apply a partial update; nothing changes unless every field is valid.
    pub fn apply_update(&mut self, update: UpdateExpense) -> DomainResult<()> {
        let category = update
            .category
            .as_deref()
            .map(|c| require_text("category", c))
            .transpose()?;
        let amount = update.amount.map(positive_amount).transpose()?;

        if let Some(category) = category {
            self.category = category;
        }
        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(spent_on) = update.spent_on {
            self.spent_on = spent_on;
        }
        if update.note.is_some() {
            self.note = optional_text(update.note);
        }
        Ok(())
    }

    pub fn search_fields(&self) -> [&str; 2] {
        [self.category.as_str(), self.note.as_deref().unwrap_or("")]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub category: Option<String>,
    pub range: DateRange,
}

impl ExpenseFilter {
    pub fn matches(&self, e: &Expense) -> bool {
        self.category
            .as_deref()
            .is_none_or(|c| c.eq_ignore_ascii_case(&e.category))
            && self.range.contains(e.spent_on)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total: Money,
    pub categories: Vec<CategoryTotal>,
}

impl ExpenseSummary {
    /// Totals per category (largest first) over already filtered expenses.
    pub fn build<'a>(
        range: DateRange,
        expenses: impl IntoIterator<Item = &'a Expense>,
    ) -> DomainResult<Self> {
        let mut by_category: BTreeMap<String, (Money, u64)> = BTreeMap::new();
        for e in expenses {
            let entry = by_category
                .entry(e.category.clone())
                .or_insert((Money::ZERO, 0));
            entry.0 = entry.0.checked_add(e.amount)?;
            entry.1 += 1;
        }
        Self::from_totals(
            range,
            by_category
                .into_iter()
                .map(|(category, (total, count))| CategoryTotal {
                    category,
                    total,
                    count,
                })
                .collect(),
        )
    }

    /// Assemble from per-category totals computed elsewhere (e.g. `GROUP BY`).
    pub fn from_totals(range: DateRange, mut categories: Vec<CategoryTotal>) -> DomainResult<Self> {
        categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        Ok(Self {
            from: range.from,
            to: range.to,
            total: Money::sum(categories.iter().map(|c| c.total))?,
            categories,
        })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ExpenseSort {
    #[default]
    SpentOn,
    Amount,
    Category,
    CreatedAt,
}

impl SortField for ExpenseSort {
    const NAMES: &'static [&'static str] = &["spent_on", "amount", "category", "created_at"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "spent_on" => Some(ExpenseSort::SpentOn),
            "amount" => Some(ExpenseSort::Amount),
            "category" => Some(ExpenseSort::Category),
            "created_at" => Some(ExpenseSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            ExpenseSort::SpentOn => "spent_on",
            ExpenseSort::Amount => "amount",
            ExpenseSort::Category => "category",
            ExpenseSort::CreatedAt => "created_at",
        }
    }

    fn default_direction(self) -> SortDirection {
        match self {
            ExpenseSort::Category => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

impl ExpenseSort {
    pub fn compare(self, a: &Expense, b: &Expense) -> core::cmp::Ordering {
        match self {
            ExpenseSort::SpentOn => a.spent_on.cmp(&b.spent_on),
            ExpenseSort::Amount => a.amount.cmp(&b.amount),
            ExpenseSort::Category => a.category.to_lowercase().cmp(&b.category.to_lowercase()),
            ExpenseSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn expense(category: &str, amount: i64) -> Expense {
        Expense::create(
            NewExpense {
                category: category.into(),
                amount,
                spent_on: None,
                note: None,
            },
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn amount_must_be_positive() {
        let err = Expense::create(
            NewExpense {
                category: "rent".into(),
                amount: 0,
                spent_on: None,
                note: None,
            },
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "amount", .. }));
    }

    #[test]
    fn failed_update_leaves_expense_untouched() {
        let mut e = expense("rent", 1000);
        let before = e.clone();
        let err = e.apply_update(UpdateExpense {
            category: Some("utilities".into()),
            amount: Some(-5),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(e, before);
    }

    #[test]
    fn summary_groups_by_category() {
        let items = [expense("rent", 1000), expense("power", 300), expense("power", 200)];
        let s = ExpenseSummary::build(DateRange::default(), items.iter()).unwrap();
        assert_eq!(s.total, Money::from_minor(1500));
        assert_eq!(s.categories[0].category, "rent");
        assert_eq!(s.categories[1].total, Money::from_minor(500));
        assert_eq!(s.categories[1].count, 2);
    }

    proptest! {
        #[test]
        fn summary_total_equals_sum_of_amounts(amounts in proptest::collection::vec(1i64..1_000_000, 0..20)) {
            let items: Vec<Expense> = amounts.iter().enumerate()
                .map(|(i, a)| expense(if i % 2 == 0 { "a" } else { "b" }, *a))
                .collect();
            let s = ExpenseSummary::build(DateRange::default(), items.iter()).unwrap();
            prop_assert_eq!(s.total.minor(), amounts.iter().sum::<i64>());
        }
    }
}
