//! Window planner implementation

use chrono::{DateTime, Duration, Utc};

/// Query format for the first second of a window's start day
pub const WINDOW_START_FORMAT: &str = "%Y-%m-%dT00:00:00";

/// Query format for the last second of a window's end day
pub const WINDOW_END_FORMAT: &str = "%Y-%m-%dT23:59:59";

/// A date range requested in one API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Window start
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Create a window
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Start bound as sent to the API
    pub fn start_param(&self) -> String {
        self.start.format(WINDOW_START_FORMAT).to_string()
    }

    /// End bound as sent to the API
    pub fn end_param(&self) -> String {
        self.end.format(WINDOW_END_FORMAT).to_string()
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.date_naive(),
            self.end.date_naive()
        )
    }
}

/// Plans windows relative to a fixed `now`
#[derive(Debug, Clone, Copy)]
pub struct WindowPlanner {
    now: DateTime<Utc>,
    attribution_window: Duration,
}

impl WindowPlanner {
    /// Create a planner
    pub fn new(now: DateTime<Utc>, attribution_window: Duration) -> Self {
        Self {
            now,
            attribution_window,
        }
    }

    /// The instant windows are planned up to
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// First instant a windowed stream re-scans from
    ///
    /// Never further back than the attribution cutoff. A bookmark in the
    /// future collapses to `now`. A cutoff before the representable range
    /// saturates at the earliest instant.
    pub fn effective_start(&self, last_bookmark: DateTime<Utc>) -> DateTime<Utc> {
        let cutoff = self
            .now
            .checked_sub_signed(self.attribution_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        std::cmp::min(std::cmp::max(last_bookmark, cutoff), self.now)
    }

    /// Windows of `window_size_days` covering `[effective_start, now]`
    pub fn windowed(&self, last_bookmark: DateTime<Utc>, window_size_days: u32) -> WindowPlan {
        let size_days = i64::from(window_size_days.max(1));
        WindowPlan::new(self.effective_start(last_bookmark), size_days, self.now)
    }

    /// One window covering `[last_bookmark, now]`
    ///
    /// Used for streams whose requests are not date-sliced; the plan's
    /// size is informational.
    pub fn single(&self, last_bookmark: DateTime<Utc>) -> WindowPlan {
        let start = std::cmp::min(last_bookmark, self.now);
        WindowPlan::new(start, span_days(start, self.now), self.now)
    }
}

/// Whole days needed to cover `[start, end]`, rounded up
fn span_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    const SECONDS_PER_DAY: i64 = 86_400;
    let seconds = (end - start).num_seconds().max(0);
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

/// Iterator over the windows of one stream sync
#[derive(Debug, Clone)]
pub struct WindowPlan {
    next: Option<DateWindow>,
    size_days: i64,
    now: DateTime<Utc>,
}

impl WindowPlan {
    fn new(start: DateTime<Utc>, size_days: i64, now: DateTime<Utc>) -> Self {
        let end = std::cmp::min(start + Duration::days(size_days), now);
        let next = (start < now).then(|| DateWindow::new(start, end));
        Self {
            next,
            size_days,
            now,
        }
    }

    /// Days per window
    pub fn size_days(&self) -> i64 {
        self.size_days
    }
}

impl Iterator for WindowPlan {
    type Item = DateWindow;

    fn next(&mut self) -> Option<DateWindow> {
        let current = self.next.take()?;

        let start = current.end + Duration::days(1);
        if start < self.now {
            let end = std::cmp::min(current.end + Duration::days(self.size_days), self.now);
            self.next = Some(DateWindow::new(start, end));
        }

        Some(current)
    }
}
