use serde::{Deserialize, Serialize};

pub const NUM_ATTRIBUTES: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttributeType {
    Strength,
    Agility,
    Intellect,
    Stamina,
}

impl AttributeType {
    pub fn all() -> [AttributeType; NUM_ATTRIBUTES] {
        [
            AttributeType::Strength,
            AttributeType::Agility,
            AttributeType::Intellect,
            AttributeType::Stamina,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            AttributeType::Strength => 0,
            AttributeType::Agility => 1,
            AttributeType::Intellect => 2,
            AttributeType::Stamina => 3,
        }
    }
}

/// Flat attribute block. Used both for a hero's base stats and for the
/// bonus granted by equipped gear.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attributes {
    #[serde(default)]
    values: [u32; NUM_ATTRIBUTES],
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, attr: AttributeType) -> u32 {
        self.values[attr.index()]
    }

    pub fn set(&mut self, attr: AttributeType, value: u32) {
        self.values[attr.index()] = value;
    }

    /// Builder-style setter, handy for rosters built in code.
    pub fn with(mut self, attr: AttributeType, value: u32) -> Self {
        self.set(attr, value);
        self
    }

    /// Sum of two attribute blocks (base + gear).
    pub fn combined(&self, other: &Attributes) -> Attributes {
        let mut out = *self;
        for attr in AttributeType::all() {
            out.set(attr, self.get(attr).saturating_add(other.get(attr)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_default_zero() {
        let attrs = Attributes::new();
        for attr in AttributeType::all() {
            assert_eq!(attrs.get(attr), 0);
        }
    }

    #[test]
    fn test_combined_adds_each_attribute() {
        let base = Attributes::new()
            .with(AttributeType::Strength, 5)
            .with(AttributeType::Agility, 10);
        let gear = Attributes::new()
            .with(AttributeType::Agility, 4)
            .with(AttributeType::Stamina, 2);
        let total = base.combined(&gear);
        assert_eq!(total.get(AttributeType::Strength), 5);
        assert_eq!(total.get(AttributeType::Agility), 14);
        assert_eq!(total.get(AttributeType::Intellect), 0);
        assert_eq!(total.get(AttributeType::Stamina), 2);
    }

    #[test]
    fn test_indices_are_unique() {
        let mut seen = [false; NUM_ATTRIBUTES];
        for attr in AttributeType::all() {
            assert!(!seen[attr.index()]);
            seen[attr.index()] = true;
        }
    }
}
