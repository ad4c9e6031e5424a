//! Focus-quality scores for a single image plane and best-plane search over a z-stack.
//!
//! Stacks are laid out (rows, cols, slice) to match the pixel-first layout of the image stores.

use ndarray::{ArrayView2, ArrayView3, Axis};

/// Scalar sharpness score of one image plane; larger is sharper.
pub trait FocusMetric: Send + Sync {
    fn score(&self,image:ArrayView2<f32>) -> f64;
}

/// Sum of squared forward differences along both pixel axes.
#[derive(Clone,Copy,Debug,Default)]
pub struct GradientEnergy;

impl FocusMetric for GradientEnergy {
    fn score(&self,image:ArrayView2<f32>) -> f64 {
        let (rows,cols) = image.dim();
        let mut energy = 0.0f64;
        for r in 0..rows {
            for c in 0..cols {
                let v = image[[r,c]] as f64;
                if r + 1 < rows {
                    let d = image[[r + 1,c]] as f64 - v;
                    energy += d*d;
                }
                if c + 1 < cols {
                    let d = image[[r,c + 1]] as f64 - v;
                    energy += d*d;
                }
            }
        }
        energy
    }
}

/// Variance of the 4-neighbour Laplacian over the interior pixels.
#[derive(Clone,Copy,Debug,Default)]
pub struct LaplacianVariance;

impl FocusMetric for LaplacianVariance {
    fn score(&self,image:ArrayView2<f32>) -> f64 {
        let (rows,cols) = image.dim();
        if rows < 3 || cols < 3 {
            return 0.0
        }
        let mut values = Vec::with_capacity((rows - 2)*(cols - 2));
        for r in 1..rows - 1 {
            for c in 1..cols - 1 {
                let lap = image[[r - 1,c]] + image[[r + 1,c]] + image[[r,c - 1]] + image[[r,c + 1]] - 4.0*image[[r,c]];
                values.push(lap as f64);
            }
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        values.iter().map(|v| (v - mean)*(v - mean)).sum::<f64>() / n
    }
}

/// score every slice of a (rows, cols, slice) stack
pub fn slice_scores(stack:ArrayView3<f32>,metric:&dyn FocusMetric) -> Vec<f64> {
    stack.axis_iter(Axis(2)).map(|plane| metric.score(plane)).collect()
}

/// 0-based index of the sharpest slice; the first one wins ties
pub fn best_focus_index(stack:ArrayView3<f32>,metric:&dyn FocusMetric) -> usize {
    let scores = slice_scores(stack,metric);
    let mut best = 0;
    for (i,s) in scores.iter().enumerate() {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn blurred_stack(n_slices:usize,sharp:usize) -> Array3<f32> {
        Array3::from_shape_fn((12,12,n_slices),|(r,c,s)| {
            let checker = if (r + c) % 2 == 0 {1.0} else {0.0};
            let blur = 1.0 / (1.0 + (s as f32 - sharp as f32).abs());
            0.5 + (checker - 0.5)*blur
        })
    }

    #[test]
    fn gradient_energy_finds_sharp_plane() {
        let stack = blurred_stack(7,4);
        assert_eq!(best_focus_index(stack.view(),&GradientEnergy),4);
    }

    #[test]
    fn laplacian_variance_finds_sharp_plane() {
        let stack = blurred_stack(5,1);
        assert_eq!(best_focus_index(stack.view(),&LaplacianVariance),1);
    }

    #[test]
    fn flat_image_scores_zero() {
        let stack = Array3::<f32>::from_elem((4,4,1),3.0);
        assert_eq!(slice_scores(stack.view(),&GradientEnergy),vec![0.0]);
        assert_eq!(slice_scores(stack.view(),&LaplacianVariance),vec![0.0]);
    }
}
