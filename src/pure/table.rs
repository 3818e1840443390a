//! The table engine: growing, shrinking and compacting the per-workspace
//! grid, and the width/height factor maths behind user resizes.
use crate::pure::{container::Container, workspace::Workspace};
use tracing::debug;

/// Split `total` pixels between tracks with the given factors.
///
/// A factor of 0.0 takes the default share (`total / n`); a non-zero factor
/// takes that fraction of the unoccupied space (the space left over once all
/// default tracks have taken their share). Pixel widths are produced by
/// rounding the running edge positions so the tracks always sum to exactly
/// `total`.
pub fn track_sizes(factors: &[f64], total: u32) -> Vec<u32> {
    let n = factors.len();
    if n == 0 {
        return Vec::new();
    }

    let default = total as f64 / n as f64;
    let unoccupied = unoccupied_space(factors, total);

    let mut sizes = Vec::with_capacity(n);
    let mut acc = 0.0;
    let mut prev_edge = 0i64;
    for &f in factors {
        acc += if f > 0.0 { f * unoccupied } else { default };
        let edge = acc.round() as i64;
        sizes.push((edge - prev_edge).max(0) as u32);
        prev_edge = edge;
    }

    sizes
}

/// The space available to user-resized tracks: the total minus the default
/// shares taken by every track still at its default factor.
pub fn unoccupied_space(factors: &[f64], total: u32) -> f64 {
    let n = factors.len();
    if n == 0 {
        return total as f64;
    }

    let default = total as f64 / n as f64;
    let n_default = factors.iter().filter(|&&f| f == 0.0).count();

    total as f64 - n_default as f64 * default
}

/// Resize the boundary between tracks `first` and `second` by `pixels`
/// (positive moves the boundary towards `second`).
///
/// Custom factors on other tracks are rescaled so their pixel sizes stay
/// constant when `first`/`second` switch from default to custom shares.
/// Factors driven to zero or below are clamped so the track keeps at least
/// `min_px` pixels.
pub fn resize_tracks(factors: &mut [f64], total: u32, first: usize, second: usize, pixels: i32, min_px: u32) {
    let n = factors.len();
    if n < 2 || first >= n || second >= n || first == second || pixels == 0 {
        return;
    }

    let default = total as f64 / n as f64;
    let old_unoccupied = unoccupied_space(factors, total);
    let mut new_unoccupied = old_unoccupied;

    if factors[first] == 0.0 {
        new_unoccupied += default;
    }
    if factors[second] == 0.0 {
        new_unoccupied += default;
    }

    let old_first = if factors[first] == 0.0 {
        default
    } else {
        factors[first] * old_unoccupied
    };
    let old_second = if factors[second] == 0.0 {
        default
    } else {
        factors[second] * old_unoccupied
    };

    // Keep the pixel sizes of existing custom tracks stable under the changed
    // unoccupied space. For first/second this composes with the factor update
    // below, which works on their real old pixel widths.
    if new_unoccupied != old_unoccupied {
        for f in factors.iter_mut() {
            if *f != 0.0 {
                *f = (*f * old_unoccupied) / new_unoccupied;
            }
        }
    }

    if factors[first] == 0.0 {
        factors[first] = default / new_unoccupied;
    }
    factors[first] *= (old_first + pixels as f64) / old_first;

    if factors[second] == 0.0 {
        factors[second] = default / new_unoccupied;
    }
    factors[second] *= (old_second - pixels as f64) / old_second;

    for i in [first, second] {
        if factors[i] <= 0.0 {
            factors[i] = min_px as f64 / new_unoccupied;
        }
    }

    debug!(first = factors[first], second = factors[second], "factors after resize");
}

impl Workspace {
    /// Bounds check for a table cell.
    pub fn cell_exists(&self, col: isize, row: isize) -> bool {
        col >= 0 && (col as usize) < self.cols() && row >= 0 && (row as usize) < self.rows()
    }

    /// Append one row of empty containers to the table.
    pub fn expand_rows(&mut self) {
        let row = self.rows();
        for (c, column) in self.table.iter_mut().enumerate() {
            column.push(Container::new(c, row));
        }
        self.height_factor.push(0.0);
    }

    /// Prepend one row of empty containers, shifting all existing rows down.
    pub fn expand_rows_at_head(&mut self) {
        for (c, column) in self.table.iter_mut().enumerate() {
            column.insert(0, Container::new(c, 0));
            for (r, cell) in column.iter_mut().enumerate() {
                cell.row = r;
            }
        }
        self.height_factor.insert(0, 0.0);
        self.current_row += 1;
    }

    /// Append one column of empty containers to the table.
    pub fn expand_cols(&mut self) {
        let col = self.cols();
        let rows = self.rows();
        self.table.push((0..rows).map(|r| Container::new(col, r)).collect());
        self.width_factor.push(0.0);
    }

    /// Prepend one column of empty containers, shifting all existing columns
    /// right.
    pub fn expand_cols_at_head(&mut self) {
        let rows = self.rows();
        self.table.insert(0, (0..rows).map(|r| Container::new(0, r)).collect());
        self.width_factor.insert(0, 0.0);
        for (c, column) in self.table.iter_mut().enumerate() {
            for cell in column.iter_mut() {
                cell.col = c;
            }
        }
        self.current_col += 1;
    }

    /// Remove the last row, handing its factor to the last remaining
    /// customized row.
    pub fn shrink_rows(&mut self) {
        self.remove_row(self.rows() - 1);
    }

    /// Remove the last column, handing its factor to the last remaining
    /// customized column.
    pub fn shrink_cols(&mut self) {
        self.remove_col(self.cols() - 1);
    }

    fn remove_col(&mut self, col: usize) {
        self.table.remove(col);
        let removed = self.width_factor.remove(col);
        redistribute(&mut self.width_factor, removed);

        for (c, column) in self.table.iter_mut().enumerate() {
            for cell in column.iter_mut() {
                cell.col = c;
            }
        }
    }

    fn remove_row(&mut self, row: usize) {
        for column in self.table.iter_mut() {
            column.remove(row);
            for (r, cell) in column.iter_mut().enumerate() {
                cell.row = r;
            }
        }
        let removed = self.height_factor.remove(row);
        redistribute(&mut self.height_factor, removed);
    }

    /// Compact the table: drop every column and row in which no cell has a
    /// focused client, keeping at least a 1x1 grid. The current cell is
    /// clamped to the new bounds.
    pub fn cleanup_table(&mut self) {
        let mut c = 0;
        while self.cols() > 1 && c < self.cols() {
            if self.table[c].iter().all(|cell| cell.focused.is_none()) {
                debug!(col = c, "removing empty column");
                self.remove_col(c);
            } else {
                c += 1;
            }
        }

        let mut r = 0;
        while self.rows() > 1 && r < self.rows() {
            if self.table.iter().all(|column| column[r].focused.is_none()) {
                debug!(row = r, "removing empty row");
                self.remove_row(r);
            } else {
                r += 1;
            }
        }

        self.current_col = self.current_col.min(self.cols() - 1);
        self.current_row = self.current_row.min(self.rows() - 1);
    }

    /// Shrink col/row spans until no container's spanned range covers another
    /// non-empty container.
    pub fn fix_colrowspan(&mut self) {
        let (cols, rows) = (self.cols(), self.rows());

        for c in 0..cols {
            for r in 0..rows {
                while self.table[c][r].colspan > 1 {
                    let span = self.table[c][r].colspan;
                    let covered = (c + 1..(c + span).min(cols))
                        .any(|cc| !self.table[cc][r].is_empty());
                    if covered || c + span > cols {
                        self.table[c][r].colspan -= 1;
                    } else {
                        break;
                    }
                }

                while self.table[c][r].rowspan > 1 {
                    let span = self.table[c][r].rowspan;
                    let covered = (r + 1..(r + span).min(rows))
                        .any(|rr| !self.table[c][rr].is_empty());
                    if covered || r + span > rows {
                        self.table[c][r].rowspan -= 1;
                    } else {
                        break;
                    }
                }
            }
        }
    }

    /// Pixel widths of every column for the given total width.
    pub fn col_widths(&self, total: u32) -> Vec<u32> {
        track_sizes(&self.width_factor, total)
    }

    /// Pixel heights of every row for the given usable height (the workspace
    /// rect minus dock reservations and the internal bar).
    pub fn row_heights(&self, usable: u32) -> Vec<u32> {
        track_sizes(&self.height_factor, usable)
    }
}

fn redistribute(factors: &mut [f64], removed: f64) {
    if removed == 0.0 {
        return;
    }
    if let Some(f) = factors.iter_mut().rev().find(|f| **f > 0.0) {
        *f += removed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Xid;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use simple_test_case::test_case;

    fn ws_with_grid(cols: usize, rows: usize) -> Workspace {
        let mut ws = Workspace::new(0);
        for _ in 1..cols {
            ws.expand_cols();
        }
        for _ in 1..rows {
            ws.expand_rows();
        }
        ws
    }

    fn occupy(ws: &mut Workspace, col: usize, row: usize, id: u32) {
        ws.table[col][row].clients.push(Xid(id));
        ws.table[col][row].focused = Some(Xid(id));
    }

    #[test]
    fn three_default_columns_split_1000px() {
        let ws = ws_with_grid(3, 1);

        assert_eq!(ws.col_widths(1000), vec![333, 334, 333]);
    }

    #[test_case(2, 1000, vec![500, 500]; "two cols")]
    #[test_case(4, 1000, vec![250, 250, 250, 250]; "four cols")]
    #[test_case(1, 999, vec![999]; "single col")]
    #[test]
    fn default_tracks_sum_to_total(cols: usize, total: u32, expected: Vec<u32>) {
        let ws = ws_with_grid(cols, 1);

        assert_eq!(ws.col_widths(total), expected);
    }

    #[test]
    fn custom_factors_take_their_fraction_of_unoccupied() {
        let mut ws = ws_with_grid(2, 1);
        resize_tracks(&mut ws.width_factor, 1000, 0, 1, 100, 50);

        assert_eq!(ws.width_factor, vec![0.6, 0.4]);
        assert_eq!(ws.col_widths(1000), vec![600, 400]);
    }

    #[test]
    fn expand_at_head_renumbers_and_shifts_selection() {
        let mut ws = ws_with_grid(2, 1);
        occupy(&mut ws, 0, 0, 1);
        ws.current_col = 1;

        ws.expand_cols_at_head();

        assert_eq!(ws.cols(), 3);
        assert_eq!(ws.current_col, 2);
        assert_eq!(ws.table[1][0].focused, Some(Xid(1)));
        for (c, column) in ws.table.iter().enumerate() {
            assert!(column.iter().all(|cell| cell.col == c));
        }
    }

    #[test]
    fn cleanup_drops_empty_tracks_and_clamps_selection() {
        let mut ws = ws_with_grid(3, 2);
        occupy(&mut ws, 0, 0, 1);
        occupy(&mut ws, 2, 0, 2);
        ws.current_col = 2;
        ws.current_row = 1;

        ws.cleanup_table();

        assert_eq!(ws.cols(), 2);
        assert_eq!(ws.rows(), 1);
        assert_eq!(ws.current_col, 1);
        assert_eq!(ws.current_row, 0);
        assert_eq!(ws.table[1][0].focused, Some(Xid(2)));
    }

    #[test]
    fn cleanup_never_goes_below_one_by_one() {
        let mut ws = ws_with_grid(3, 3);

        ws.cleanup_table();

        assert_eq!((ws.cols(), ws.rows()), (1, 1));
    }

    #[test]
    fn shrink_hands_factor_to_last_customized_track() {
        let mut ws = ws_with_grid(3, 1);
        ws.width_factor = vec![0.25, 0.5, 0.25];

        ws.shrink_cols();

        assert_eq!(ws.width_factor, vec![0.25, 0.75]);
    }

    #[test]
    fn shrink_with_all_defaults_does_not_redistribute() {
        let mut ws = ws_with_grid(3, 1);

        ws.shrink_cols();

        assert_eq!(ws.width_factor, vec![0.0, 0.0]);
    }

    #[test]
    fn fix_colrowspan_shrinks_overlapping_spans() {
        let mut ws = ws_with_grid(3, 1);
        occupy(&mut ws, 0, 0, 1);
        occupy(&mut ws, 2, 0, 2);
        ws.table[0][0].colspan = 3;

        ws.fix_colrowspan();

        assert_eq!(ws.table[0][0].colspan, 2);
    }

    #[test]
    fn resize_moves_pixels_between_tracks() {
        let mut factors = vec![0.0, 0.0, 0.0];

        resize_tracks(&mut factors, 999, 0, 1, 100, 50);

        let widths = track_sizes(&factors, 999);
        assert_eq!(widths[0], 433);
        assert_eq!(widths[1], 233);
        assert_eq!(widths[2], 333);
        assert_eq!(widths.iter().sum::<u32>(), 999);
    }

    #[test]
    fn resize_keeps_uninvolved_custom_tracks_stable() {
        let mut factors = vec![0.0, 0.0, 0.0];
        resize_tracks(&mut factors, 900, 1, 2, 100, 50);
        let before = track_sizes(&factors, 900)[2];

        resize_tracks(&mut factors, 900, 0, 1, 60, 50);

        assert_eq!(track_sizes(&factors, 900)[2], before);
    }

    #[test]
    fn resize_clamps_collapsed_tracks() {
        let mut factors = vec![0.5, 0.5];

        resize_tracks(&mut factors, 1000, 0, 1, -2000, 50);

        let widths = track_sizes(&factors, 1000);
        assert!(widths[0] >= 50);
    }

    #[derive(Debug, Clone, Copy)]
    struct Delta(i32);

    impl Arbitrary for Delta {
        fn arbitrary(g: &mut Gen) -> Self {
            Delta((i32::arbitrary(g) % 100).clamp(-99, 99))
        }
    }

    #[quickcheck]
    fn resize_then_inverse_resize_round_trips(d: Delta) -> bool {
        let mut factors = vec![0.3, 0.3, 0.4];
        let before = factors.clone();

        resize_tracks(&mut factors, 1000, 0, 1, d.0, 1);
        resize_tracks(&mut factors, 1000, 0, 1, -d.0, 1);

        factors
            .iter()
            .zip(before.iter())
            .all(|(a, b)| (a - b).abs() <= f64::EPSILON * 4.0)
    }

    #[quickcheck]
    fn track_sizes_always_sum_to_total(total: u32, n: u8) -> bool {
        let total = total % 10_000 + 100;
        let n = (n % 8 + 1) as usize;
        let factors = vec![0.0; n];

        track_sizes(&factors, total).iter().sum::<u32>() == total
    }

    #[quickcheck]
    fn factor_invariant_holds_after_resize(d: Delta) -> bool {
        // sum of custom track pixels + default shares == total
        let mut factors = vec![0.0, 0.0, 0.0, 0.0];
        resize_tracks(&mut factors, 1000, 1, 2, d.0, 1);

        let total: u32 = track_sizes(&factors, 1000).iter().sum();
        total == 1000
    }
}
