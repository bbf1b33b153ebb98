//! Grid layouts for multi-chart figures.
//!
//! There are two dispatchers and they are not interchangeable: they support
//! different plot counts and return different shapes.

use serde::Serialize;

use crate::error::{diagnosed, Result, ValidityError};

/// Pixel size and grid shape for the validity-index line charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FigureLayout {
    pub height: u32,
    pub width: u32,
    pub rows: usize,
    pub columns: usize,
}

/// Grid shape for the k-cluster scatter plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridShape {
    pub rows: usize,
    pub columns: usize,
}

const VALIDITY_LAYOUT: &str = "validity_chart_layout";
const SCATTER_GRID: &str = "scatter_grid_shape";

/// Layout for up to four validity-index charts. Only the length of `plots`
/// matters.
pub fn validity_chart_layout<T>(plots: &[T]) -> Result<FigureLayout> {
    diagnosed(VALIDITY_LAYOUT, module_path!(), || {
        let layout = match plots.len() {
            1 => FigureLayout {
                height: 500,
                width: 500,
                rows: 1,
                columns: 1,
            },
            2 => FigureLayout {
                height: 500,
                width: 1000,
                rows: 1,
                columns: 2,
            },
            3 => FigureLayout {
                height: 500,
                width: 1500,
                rows: 1,
                columns: 3,
            },
            4 => FigureLayout {
                height: 1000,
                width: 1000,
                rows: 2,
                columns: 2,
            },
            count => {
                return Err(ValidityError::UnsupportedCount {
                    operation: VALIDITY_LAYOUT,
                    count,
                });
            }
        };
        Ok(layout)
    })
}

/// Rows and columns for a grid of one scatter plot per requested k. Only the
/// length of `ks` matters.
pub fn scatter_grid_shape<T>(ks: &[T]) -> Result<GridShape> {
    diagnosed(SCATTER_GRID, module_path!(), || {
        let count = ks.len();
        let (rows, columns) = match count {
            1 | 2 | 3 | 5 | 7 => (1, count),
            4 | 9 => {
                let side = (count as f64).sqrt().floor() as usize;
                (side, side)
            }
            6 => (2, 3),
            8 => (2, 4),
            _ => {
                return Err(ValidityError::UnsupportedCount {
                    operation: SCATTER_GRID,
                    count,
                });
            }
        };
        Ok(GridShape { rows, columns })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layout(n: usize) -> Result<FigureLayout> {
        validity_chart_layout(&vec![0usize; n])
    }

    fn grid(n: usize) -> Result<(usize, usize)> {
        scatter_grid_shape(&vec![2usize; n]).map(|g| (g.rows, g.columns))
    }

    #[test]
    fn test_validity_layout_literals() {
        assert_eq!(
            layout(1),
            Ok(FigureLayout {
                height: 500,
                width: 500,
                rows: 1,
                columns: 1,
            })
        );
        assert_eq!(
            layout(2),
            Ok(FigureLayout {
                height: 500,
                width: 1000,
                rows: 1,
                columns: 2,
            })
        );
        assert_eq!(
            layout(3),
            Ok(FigureLayout {
                height: 500,
                width: 1500,
                rows: 1,
                columns: 3,
            })
        );
        assert_eq!(
            layout(4),
            Ok(FigureLayout {
                height: 1000,
                width: 1000,
                rows: 2,
                columns: 2,
            })
        );
    }

    #[test]
    fn test_validity_layout_unsupported() {
        assert_eq!(
            layout(5),
            Err(ValidityError::UnsupportedCount {
                operation: VALIDITY_LAYOUT,
                count: 5,
            })
        );
        assert!(layout(0).is_err());
    }

    #[test]
    fn test_scatter_grid_table() {
        for n in [1, 2, 3, 5, 7] {
            assert_eq!(grid(n), Ok((1, n)));
        }
        assert_eq!(grid(4), Ok((2, 2)));
        assert_eq!(grid(6), Ok((2, 3)));
        assert_eq!(grid(8), Ok((2, 4)));
        assert_eq!(grid(9), Ok((3, 3)));
        assert!(matches!(
            grid(10),
            Err(ValidityError::UnsupportedCount { count: 10, .. })
        ));
        assert!(grid(0).is_err());
    }

    #[test]
    fn test_dispatchers_disagree_on_length_five() {
        assert!(layout(5).is_err());
        assert_eq!(grid(5), Ok((1, 5)));
    }

    proptest! {
        #[test]
        fn prop_scatter_grid_holds_every_plot(n in 0usize..40) {
            match grid(n) {
                Ok((rows, columns)) => prop_assert_eq!(rows * columns, n),
                Err(_) => prop_assert!(n == 0 || n >= 10),
            }
        }

        #[test]
        fn prop_validity_layout_only_up_to_four(n in 0usize..40) {
            prop_assert_eq!(layout(n).is_ok(), (1..=4).contains(&n));
        }
    }
}
