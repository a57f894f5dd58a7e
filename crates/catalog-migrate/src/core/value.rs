//! Row batches moved between source and target.
//!
//! Values travel as text. The source session pins its date and number
//! formats so every value converts back on insert, and NULL stays distinct
//! from the empty string.

/// One row, in the column order of the read request.
pub type Row = Vec<Option<String>>;

/// A bounded chunk of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub rows: Vec<Row>,
}

impl Batch {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Longest value in bytes per column, used to size insert buffers.
    pub fn max_widths(&self, columns: usize) -> Vec<usize> {
        let mut widths = vec![1usize; columns];
        for row in &self.rows {
            for (i, value) in row.iter().enumerate().take(columns) {
                if let Some(v) = value {
                    widths[i] = widths[i].max(v.len());
                }
            }
        }
        widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_widths() {
        let batch = Batch::new(vec![
            vec![Some("1".into()), Some("alpha".into()), None],
            vec![Some("200".into()), None, None],
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.max_widths(3), vec![3, 5, 1]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = Batch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.max_widths(2), vec![1, 1]);
    }
}
