// ============================================================
// Layer 3 — CIFAR-10 Class Table
// ============================================================
// The dataset labels are the integers 0..10. This table maps
// each label index to a display name plus the emoji, short
// description and colour the web frontend renders.
//
// The order MUST match the label bytes in the CIFAR-10 binary
// files: index 0 is "airplane", index 9 is "truck".

use serde::Serialize;

/// Number of output classes of the classifier head
pub const NUM_CLASSES: usize = 10;

/// Display metadata for one CIFAR-10 label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub name:        &'static str,
    pub emoji:       &'static str,
    pub description: &'static str,
    pub color:       &'static str,
}

impl ClassInfo {
    const fn new(
        name:        &'static str,
        emoji:       &'static str,
        description: &'static str,
        color:       &'static str,
    ) -> Self {
        Self { name, emoji, description, color }
    }
}

pub const CIFAR10_CLASSES: [ClassInfo; NUM_CLASSES] = [
    ClassInfo::new("Airplane",   "✈️", "Flying vehicle", "#f97316"),
    ClassInfo::new("Automobile", "🚗", "Car",            "#10b981"),
    ClassInfo::new("Bird",       "🐦", "Bird",           "#8b5cf6"),
    ClassInfo::new("Cat",        "🐱", "Cat",            "#ec4899"),
    ClassInfo::new("Deer",       "🦌", "Deer",           "#facc15"),
    ClassInfo::new("Dog",        "🐶", "Dog",            "#3b82f6"),
    ClassInfo::new("Frog",       "🐸", "Frog",           "#22c55e"),
    ClassInfo::new("Horse",      "🐴", "Horse",          "#f43f5e"),
    ClassInfo::new("Ship",       "🚢", "Ship",           "#0ea5e9"),
    ClassInfo::new("Truck",      "🚚", "Truck",          "#14b8a6"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_labels() {
        assert_eq!(CIFAR10_CLASSES.len(), NUM_CLASSES);
        assert_eq!(CIFAR10_CLASSES[0].name, "Airplane");
        assert_eq!(CIFAR10_CLASSES[3].name, "Cat");
        assert_eq!(CIFAR10_CLASSES[9].name, "Truck");
    }

    #[test]
    fn test_colours_are_hex() {
        for c in CIFAR10_CLASSES.iter() {
            assert!(c.color.starts_with('#') && c.color.len() == 7, "{}", c.name);
        }
    }
}
