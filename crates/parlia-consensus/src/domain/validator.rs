//! Validator set
//!
//! The canonical order (ascending address bytes) is what turn rotation indexes
//! into, so it must be reproducible from header extra data alone.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shared_types::Address;
use std::collections::{BTreeSet, HashMap};

/// Ordered, de-duplicated set of validator identities.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ValidatorSet {
    validators: Vec<Address>,
    /// Quick lookup by address
    lookup: HashMap<Address, usize>,
}

impl ValidatorSet {
    /// Create a validator set. Input order and duplicates are irrelevant.
    pub fn new(validators: impl IntoIterator<Item = Address>) -> Self {
        let sorted: BTreeSet<Address> = validators.into_iter().collect();
        let validators: Vec<Address> = sorted.into_iter().collect();
        let lookup = validators
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, i))
            .collect();
        Self { validators, lookup }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn contains(&self, validator: &Address) -> bool {
        self.lookup.contains_key(validator)
    }

    /// Rotation position of a validator.
    pub fn index_of(&self, validator: &Address) -> Option<usize> {
        self.lookup.get(validator).copied()
    }

    pub fn get(&self, index: usize) -> Option<&Address> {
        self.validators.get(index)
    }

    /// Validators in rotation order.
    pub fn as_slice(&self) -> &[Address] {
        &self.validators
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.validators.iter()
    }

    /// Anti-repeat window: distinct signers required between two blocks of
    /// the same validator.
    pub fn recents_limit(&self) -> u64 {
        (self.validators.len() / 2 + 1) as u64
    }
}

impl Serialize for ValidatorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.validators.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidatorSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let validators = Vec::<Address>::deserialize(deserializer)?;
        Ok(Self::new(validators))
    }
}
