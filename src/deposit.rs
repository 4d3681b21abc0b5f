//! The operator's in-progress waste classification.
//!
//! A [`Deposit`] is a category plus an optional inorganic subcategory. It is
//! created empty, overwritten by button presses and cleared only after a
//! successful commit.

use core::fmt;

/// Primary waste category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Nothing selected yet.
    #[default]
    None,
    /// Food and garden waste.
    Organic,
    /// Recyclables; may carry a [`Subcategory`].
    Inorganic,
    /// Everything else.
    Residual,
}

impl Category {
    /// Backend label for this category.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::None => "--",
            Self::Organic => "Organik",
            Self::Inorganic => "Anorganik",
            Self::Residual => "Residu",
        }
    }
}

/// Inorganic subtype.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subcategory {
    /// No subtype chosen.
    #[default]
    None,
    /// Mixed inorganic.
    General,
    /// Plastic bottles.
    Bottle,
    /// Paper and cardboard.
    Paper,
}

impl Subcategory {
    /// Menu label for this subtype.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::None => "--",
            Self::General => "Umum",
            Self::Bottle => "Botol",
            Self::Paper => "Kertas",
        }
    }
}

/// Category and subcategory of the current weighing.
///
/// Invariant: `subcategory != None` implies `category == Inorganic`. The
/// fields are private so only the constructors below can build a value.
///
/// # Example
///
/// ```rust
/// use ecoscale::deposit::{Category, Deposit, Subcategory};
///
/// let deposit = Deposit::inorganic(Subcategory::Bottle);
/// assert_eq!(deposit.category(), Category::Inorganic);
/// assert_eq!(deposit.label(), "Botol");
///
/// assert_eq!(Deposit::inorganic(Subcategory::General).label(), "Anorganik");
/// assert_eq!(Deposit::default().label(), "--");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Deposit {
    category: Category,
    subcategory: Subcategory,
}

impl Deposit {
    /// The empty deposit (None, None).
    pub const EMPTY: Deposit = Deposit {
        category: Category::None,
        subcategory: Subcategory::None,
    };

    /// A single-step classification. The subcategory is always None.
    ///
    /// Passing [`Category::Inorganic`] yields an inorganic deposit with no
    /// subtype yet.
    pub const fn with_category(category: Category) -> Self {
        Self {
            category,
            subcategory: Subcategory::None,
        }
    }

    /// An inorganic deposit with the given subtype.
    pub const fn inorganic(subcategory: Subcategory) -> Self {
        Self {
            category: Category::Inorganic,
            subcategory,
        }
    }

    /// Current category.
    #[inline]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Current subcategory.
    #[inline]
    pub const fn subcategory(&self) -> Subcategory {
        self.subcategory
    }

    /// True when no category has been chosen.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        matches!(self.category, Category::None)
    }

    /// Clears back to (None, None).
    pub fn reset(&mut self) {
        *self = Self::EMPTY;
    }

    /// The classified label sent to backends and shown in the header.
    ///
    /// General inorganic waste reports as plain "Anorganik"; the other
    /// subtypes replace the category label.
    pub const fn label(&self) -> &'static str {
        match (self.category, self.subcategory) {
            (Category::Inorganic, Subcategory::Bottle) => Subcategory::Bottle.label(),
            (Category::Inorganic, Subcategory::Paper) => Subcategory::Paper.label(),
            (category, _) => category.label(),
        }
    }
}

impl fmt::Display for Deposit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let d = Deposit::default();
        assert!(d.is_empty());
        assert_eq!(d, Deposit::EMPTY);
        assert_eq!(d.subcategory(), Subcategory::None);
    }

    #[test]
    fn single_step_categories_have_no_subtype() {
        for category in [Category::Organic, Category::Residual, Category::Inorganic] {
            let d = Deposit::with_category(category);
            assert_eq!(d.category(), category);
            assert_eq!(d.subcategory(), Subcategory::None);
        }
    }

    #[test]
    fn labels_follow_backend_contract() {
        assert_eq!(Deposit::with_category(Category::Organic).label(), "Organik");
        assert_eq!(Deposit::with_category(Category::Residual).label(), "Residu");
        assert_eq!(Deposit::with_category(Category::Inorganic).label(), "Anorganik");
        assert_eq!(Deposit::inorganic(Subcategory::General).label(), "Anorganik");
        assert_eq!(Deposit::inorganic(Subcategory::Bottle).label(), "Botol");
        assert_eq!(Deposit::inorganic(Subcategory::Paper).label(), "Kertas");
        assert_eq!(Deposit::EMPTY.label(), "--");
    }

    #[test]
    fn reset_clears_both_fields() {
        let mut d = Deposit::inorganic(Subcategory::Paper);
        d.reset();
        assert_eq!(d, Deposit::EMPTY);
    }

    #[test]
    fn display_uses_label() {
        use alloc::format;
        assert_eq!(format!("{}", Deposit::inorganic(Subcategory::Bottle)), "Botol");
    }
}
