/// Which lyric line is active and the short run of lines shown with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineState {
    pub active_index: Option<usize>,
    pub window: Vec<String>,
}

impl LineState {
    pub fn active_line(&self) -> Option<&str> {
        self.window.first().map(String::as_str)
    }
}

pub const DEFAULT_WINDOW_LEN: usize = 4;

/// Place `progress_ms` on the lyric sheet.
///
/// Lines are assumed to be spread evenly over the track: each one owns
/// `duration_ms / lines.len()` milliseconds. NaN and negative progress count
/// as the start of the track; a zero duration pins the first line.
pub fn map_line(progress_ms: f64, duration_ms: u64, lines: &[String], window_len: usize) -> LineState {
    if lines.is_empty() {
        return LineState::default();
    }
    let last = lines.len() - 1;
    let progress = if progress_ms.is_nan() { 0.0 } else { progress_ms.max(0.0) };

    let index = if duration_ms == 0 {
        0
    } else {
        let ms_per_line = duration_ms as f64 / lines.len() as f64;
        // `as` saturates, so +inf lands on usize::MAX and is capped below.
        ((progress / ms_per_line).floor() as usize).min(last)
    };

    let end = index.saturating_add(window_len.max(1)).min(lines.len());
    LineState {
        active_index: Some(index),
        window: lines[index..end].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn uniform_bucketing() {
        let lines = sheet(40);
        let state = map_line(53_000.0, 200_000, &lines, DEFAULT_WINDOW_LEN);
        assert_eq!(state.active_index, Some(10));
        assert_eq!(state.window, vec!["line 10", "line 11", "line 12", "line 13"]);
        assert_eq!(state.active_line(), Some("line 10"));
    }

    #[test]
    fn empty_sheet_has_no_active_line() {
        for progress in [0.0, 1_000.0, -5.0, f64::NAN, f64::INFINITY] {
            let state = map_line(progress, 200_000, &[], DEFAULT_WINDOW_LEN);
            assert_eq!(state.active_index, None);
            assert!(state.window.is_empty());
            assert_eq!(state.active_line(), None);
        }
    }

    #[test]
    fn index_stays_in_range() {
        let lines = sheet(7);
        for progress in [-1e9, -1.0, 0.0, 1.0, 99_999.0, 100_000.0, 1e12, f64::INFINITY, f64::NAN] {
            let idx = map_line(progress, 100_000, &lines, 3).active_index.unwrap();
            assert!(idx < lines.len(), "{progress} mapped to {idx}");
        }
    }

    #[test]
    fn bad_progress_counts_as_start() {
        let lines = sheet(5);
        assert_eq!(map_line(f64::NAN, 10_000, &lines, 2).active_index, Some(0));
        assert_eq!(map_line(-300.0, 10_000, &lines, 2).active_index, Some(0));
    }

    #[test]
    fn end_of_track_uses_last_line() {
        let lines = sheet(5);
        let state = map_line(10_000.0, 10_000, &lines, 4);
        assert_eq!(state.active_index, Some(4));
        assert_eq!(state.window, vec!["line 4"]);
    }

    #[test]
    fn window_shrinks_near_the_end() {
        let lines = sheet(5);
        let state = map_line(6_500.0, 10_000, &lines, 4);
        assert_eq!(state.active_index, Some(3));
        assert_eq!(state.window, vec!["line 3", "line 4"]);
    }

    #[test]
    fn zero_duration_pins_first_line() {
        let lines = sheet(3);
        assert_eq!(map_line(5_000.0, 0, &lines, 4).active_index, Some(0));
    }

    #[test]
    fn same_inputs_same_output() {
        let lines = sheet(12);
        let a = map_line(31_337.0, 180_000, &lines, 4);
        let b = map_line(31_337.0, 180_000, &lines, 4);
        assert_eq!(a, b);
    }
}
