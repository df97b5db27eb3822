// meridian_core/src/utils.rs

use nalgebra::DMatrix;

/// Assembles an ordered list of matrices into one block-diagonal matrix with
/// zero off-diagonal blocks. An empty list yields a 0x0 matrix.
pub fn block_diag(blocks: &[DMatrix<f64>]) -> DMatrix<f64> {
    let rows = blocks.iter().map(|b| b.nrows()).sum();
    let cols = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = DMatrix::zeros(rows, cols);
    let mut r = 0;
    let mut c = 0;
    for block in blocks {
        out.view_mut((r, c), (block.nrows(), block.ncols()))
            .copy_from(block);
        r += block.nrows();
        c += block.ncols();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn block_diag_places_blocks_on_diagonal() {
        let a = DMatrix::from_element(1, 2, 1.0);
        let b = DMatrix::from_element(2, 1, 2.0);
        let out = block_diag(&[a.clone(), b.clone()]);
        assert_eq!(out.shape(), (3, 3));
        assert_abs_diff_eq!(out.view((0, 0), (1, 2)).into_owned(), a);
        assert_abs_diff_eq!(out.view((1, 2), (2, 1)).into_owned(), b);
        assert_abs_diff_eq!(out.view((1, 0), (2, 2)).into_owned(), DMatrix::zeros(2, 2));
    }

    #[test]
    fn block_diag_of_nothing_is_empty() {
        assert_eq!(block_diag(&[]).shape(), (0, 0));
    }
}
