//! Batch planning for the recognition pipeline.
//!
//! Crops are ordered by aspect ratio so that each predictor call sees images
//! of similar shape, which keeps padding small. The plan records the sorted
//! permutation and the contiguous groups cut from it; results are scattered
//! back through the permutation so callers see them in input order.

use crate::core::OCRError;

/// A 3-dimensional tensor represented as a 3D array of f32 values.
pub type Tensor3D = ndarray::Array3<f32>;

/// A 4-dimensional tensor represented as a 4D array of f32 values.
pub type Tensor4D = ndarray::Array4<f32>;

/// A dynamic-dimensional tensor of f32 values, as produced by a predictor.
pub type TensorD = ndarray::ArrayD<f32>;

/// Computes the width/height ratio of a crop.
///
/// Returns `InvalidInput` for a crop with zero width or height.
pub fn aspect_ratio(width: u32, height: u32) -> Result<f32, OCRError> {
    if width == 0 || height == 0 {
        return Err(OCRError::invalid_input(format!(
            "image has zero extent ({}x{})",
            width, height
        )));
    }
    Ok(width as f32 / height as f32)
}

/// One contiguous slice of the sorted order, processed in a single predictor call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchGroup {
    /// Offset of the first member in the sorted order.
    pub start: usize,
    /// One past the last member in the sorted order.
    pub end: usize,
    /// Largest aspect ratio among the members.
    pub max_ratio: f32,
}

impl BatchGroup {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Sorted permutation of a set of crops and the groups cut from it.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    ratios: Vec<f32>,
    order: Vec<usize>,
    batch_size: usize,
}

impl BatchPlan {
    /// Builds a plan from per-crop aspect ratios.
    ///
    /// The sort is stable, so crops with equal ratios keep their input order.
    pub fn new(ratios: Vec<f32>, batch_size: usize) -> Result<Self, OCRError> {
        if batch_size == 0 {
            return Err(OCRError::invalid_input("batch size must be greater than 0"));
        }

        let mut order: Vec<usize> = (0..ratios.len()).collect();
        order.sort_by(|&a, &b| ratios[a].total_cmp(&ratios[b]));

        Ok(Self {
            ratios,
            order,
            batch_size,
        })
    }

    /// Builds a plan from crop dimensions `(width, height)`.
    ///
    /// A crop with zero width or height is rejected with `InvalidInput`
    /// naming its input index.
    pub fn from_dimensions(
        dims: impl IntoIterator<Item = (u32, u32)>,
        batch_size: usize,
    ) -> Result<Self, OCRError> {
        let ratios = dims
            .into_iter()
            .enumerate()
            .map(|(i, (w, h))| {
                aspect_ratio(w, h).map_err(|_| {
                    OCRError::invalid_input(format!("image {} has zero extent ({}x{})", i, w, h))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(ratios, batch_size)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The sorted permutation: `order()[k]` is the input index at sorted position `k`.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Iterates over the groups in sorted order. Every group except possibly
    /// the last has exactly `batch_size` members.
    pub fn groups(&self) -> impl Iterator<Item = BatchGroup> + '_ {
        (0..self.order.len())
            .step_by(self.batch_size)
            .map(move |start| {
                let end = (start + self.batch_size).min(self.order.len());
                let max_ratio = self.order[start..end]
                    .iter()
                    .map(|&i| self.ratios[i])
                    .fold(0.0f32, f32::max);
                BatchGroup {
                    start,
                    end,
                    max_ratio,
                }
            })
    }

    /// Input indices of the members of `group`, in sorted order.
    pub fn members(&self, group: &BatchGroup) -> &[usize] {
        &self.order[group.start..group.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_ascending_and_stable() {
        let plan = BatchPlan::new(vec![2.0, 1.0, 2.0, 0.5, 1.0], 2).unwrap();
        assert_eq!(plan.order(), &[3, 1, 4, 0, 2]);
    }

    #[test]
    fn test_groups_and_max_ratio() {
        let plan = BatchPlan::new(vec![3.0, 0.5, 1.5], 2).unwrap();
        assert_eq!(plan.order(), &[1, 2, 0]);

        let groups: Vec<_> = plan.groups().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(plan.members(&groups[0]), &[1, 2]);
        assert_eq!(groups[0].max_ratio, 1.5);
        assert_eq!(plan.members(&groups[1]), &[0]);
        assert_eq!(groups[1].max_ratio, 3.0);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_group_count_covers_all_inputs() {
        let plan = BatchPlan::new(vec![1.0; 13], 6).unwrap();
        let sizes: Vec<_> = plan.groups().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![6, 6, 1]);
    }

    #[test]
    fn test_empty_plan() {
        let plan = BatchPlan::new(Vec::new(), 4).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.groups().count(), 0);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(BatchPlan::new(vec![1.0], 0).is_err());
    }

    #[test]
    fn test_from_dimensions_rejects_zero_extent() {
        let plan = BatchPlan::from_dimensions([(100, 32), (40, 20)], 6).unwrap();
        assert_eq!(plan.order(), &[1, 0]);
        let group = plan.groups().next().unwrap();
        assert_eq!(group.max_ratio, 3.125);

        let err = BatchPlan::from_dimensions([(100, 32), (10, 0)], 6).unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { ref message } if message.contains("image 1")));
    }
}
