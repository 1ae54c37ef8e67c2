use crate::detected_points::CorrespondenceSet;

/// Drops every correspondence whose left or right point shares its location
/// with another correspondence on the same side.
///
/// A point matched to more than one counterpart makes all of those matches
/// suspect, so none of them survive. Survivors keep their input order.
pub fn dedup(set: &CorrespondenceSet) -> CorrespondenceSet {
    let left = set.left();
    let right = set.right();
    let n = set.len();

    let mut kept = CorrespondenceSet::default();
    for i in 0..n {
        let bad = (0..n).any(|j| {
            j != i && (left[i].same_location(&left[j]) || right[i].same_location(&right[j]))
        });
        if !bad {
            kept.push(left[i].clone(), right[i].clone());
        }
    }
    kept
}
