use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Row-wise softmax with max subtraction so large scores don't overflow the
/// exponential.
pub fn softmax(scores: &Array2<f32>) -> Array2<f32> {
    let row_max = scores
        .map_axis(Axis(1), |row| {
            row.fold(f32::NEG_INFINITY, |m, &v| m.max(v))
        })
        .insert_axis(Axis(1));

    let mut probs = (scores - &row_max).mapv(f32::exp);
    let row_sum = probs.sum_axis(Axis(1)).insert_axis(Axis(1));
    probs /= &row_sum;
    probs
}

/// Mean negative log-probability of the correct class over the batch.
///
/// Labels must lie in `[0, C)`; that is a caller precondition, not checked
/// here beyond the implicit bounds check of the indexing.
pub fn cross_entropy(probs: &Array2<f32>, labels: &Array1<usize>) -> f32 {
    let n = labels.len();
    let total: f32 = labels
        .iter()
        .enumerate()
        .map(|(i, &class)| -probs[[i, class]].ln())
        .sum();
    total / n as f32
}

/// Index of the first maximum in a row of scores.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}
