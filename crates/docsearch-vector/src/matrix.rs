use anyhow::{ensure, Result};
use candle_core::{DType, Device, Tensor};

const NORM_EPS: f64 = 1e-12;

/// `(rows, dim)` matrix of L2-normalized document embeddings. Row `i`
/// belongs to the `i`-th document of the corpus it was built for. Memory is
/// released when the matrix is dropped.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    tensor: Tensor,
    rows: usize,
    dim: usize,
}

fn l2_normalize(t: &Tensor) -> candle_core::Result<Tensor> {
    let norm = t.sqr()?.sum_keepdim(1)?.sqrt()?.affine(1.0, NORM_EPS)?;
    t.broadcast_div(&norm)
}

impl EmbeddingMatrix {
    pub fn from_rows(rows: &[Vec<f32>], dim: usize) -> Result<Self> {
        ensure!(dim > 0, "embedding dimension must be positive");
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dim) {
            anyhow::bail!("embedding row {i} has length {}, expected {dim}", row.len());
        }
        let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let tensor = Tensor::from_vec(flat, (rows.len(), dim), &Device::Cpu)?;
        let tensor = if rows.is_empty() { tensor } else { l2_normalize(&tensor)? };
        Ok(Self { tensor, rows: rows.len(), dim })
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn dim(&self) -> usize { self.dim }

    pub fn is_empty(&self) -> bool { self.rows == 0 }

    /// New matrix holding the given rows, in the given order.
    pub fn select(&self, positions: &[usize]) -> Result<Self> {
        if let Some(p) = positions.iter().find(|p| **p >= self.rows) {
            anyhow::bail!("row {p} out of range for {} rows", self.rows);
        }
        if positions.is_empty() {
            return Self::from_rows(&[], self.dim);
        }
        let ids: Vec<u32> = positions.iter().map(|p| *p as u32).collect();
        let ids = Tensor::from_vec(ids, positions.len(), &Device::Cpu)?;
        let tensor = self.tensor.index_select(&ids, 0)?;
        Ok(Self { tensor, rows: positions.len(), dim: self.dim })
    }

    /// Cosine similarity of `query` against every row, in row order.
    pub fn similarities(&self, query: &[f32]) -> Result<Vec<f32>> {
        ensure!(query.len() == self.dim, "query embedding has length {}, expected {}", query.len(), self.dim);
        if self.rows == 0 {
            return Ok(Vec::new());
        }
        let q = Tensor::from_vec(query.to_vec(), (1, self.dim), &Device::Cpu)?;
        let q = l2_normalize(&q)?;
        let scores = self.tensor.matmul(&q.t()?.contiguous()?)?.squeeze(1)?;
        Ok(scores.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_normalized() {
        let m = EmbeddingMatrix::from_rows(&[vec![3.0, 4.0], vec![0.0, 2.0]], 2).unwrap();
        let s = m.similarities(&[3.0, 4.0]).unwrap();
        assert!((s[0] - 1.0).abs() < 1e-5);
        assert!((s[1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn empty_matrix_has_no_similarities() {
        let m = EmbeddingMatrix::from_rows(&[], 4).unwrap();
        assert!(m.is_empty());
        assert!(m.similarities(&[1.0, 0.0, 0.0, 0.0]).unwrap().is_empty());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(EmbeddingMatrix::from_rows(&[vec![1.0, 0.0], vec![1.0]], 2).is_err());
    }
}
