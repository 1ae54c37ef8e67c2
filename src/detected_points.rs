use serde::{Deserialize, Serialize};

use crate::error::AlignError;

/// A detected feature with its descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub orientation: f64,
    /// Detector response at this location.
    pub interest: f64,
    pub descriptor: Vec<f64>,
}

impl InterestPoint {
    /// A bare location without scale or descriptor.
    pub fn at(x: f64, y: f64) -> InterestPoint {
        InterestPoint {
            x,
            y,
            scale: 1.0,
            orientation: 0.0,
            interest: 0.0,
            descriptor: Vec::new(),
        }
    }

    /// Exact positional identity, the only notion of sameness between points.
    pub fn same_location(&self, other: &InterestPoint) -> bool {
        self.x == other.x && self.y == other.y
    }
}

#[derive(Deserialize)]
struct RawCorrespondences {
    left: Vec<InterestPoint>,
    right: Vec<InterestPoint>,
}

impl TryFrom<RawCorrespondences> for CorrespondenceSet {
    type Error = AlignError;

    fn try_from(raw: RawCorrespondences) -> Result<Self, Self::Error> {
        CorrespondenceSet::new(raw.left, raw.right)
    }
}

/// Matched interest points, `left[i]` pairs with `right[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCorrespondences")]
pub struct CorrespondenceSet {
    left: Vec<InterestPoint>,
    right: Vec<InterestPoint>,
}

impl CorrespondenceSet {
    pub fn new(
        left: Vec<InterestPoint>,
        right: Vec<InterestPoint>,
    ) -> Result<CorrespondenceSet, AlignError> {
        if left.len() != right.len() {
            return Err(AlignError::MismatchedLengths {
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(CorrespondenceSet { left, right })
    }

    /// Builds a set from index pairs into two interest point lists.
    pub fn from_index_pairs(
        left_points: &[InterestPoint],
        right_points: &[InterestPoint],
        pairs: &[(usize, usize)],
    ) -> CorrespondenceSet {
        let (left, right) = pairs
            .iter()
            .filter_map(|&(l, r)| Some((left_points.get(l)?.clone(), right_points.get(r)?.clone())))
            .unzip();
        CorrespondenceSet { left, right }
    }

    pub fn push(&mut self, left: InterestPoint, right: InterestPoint) {
        self.left.push(left);
        self.right.push(right);
    }

    pub fn left(&self) -> &[InterestPoint] {
        &self.left
    }

    pub fn right(&self) -> &[InterestPoint] {
        &self.right
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InterestPoint, &InterestPoint)> {
        self.left.iter().zip(self.right.iter())
    }
}
