use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, SecondsFormat, TimeZone, Timelike, Utc};

/// A point in time as seen by the generators.
///
/// Calendar fields (hour, weekday, month) are read in the sample's own
/// offset, so a sample taken from local wall-clock time yields local hours.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::clock::ClockSample;
///
/// let noon = ClockSample::utc(2024, 6, 15, 12, 0, 0).unwrap();
/// assert_eq!(noon.hour(), 12);
/// assert_eq!(noon.weekday(), 6); // Saturday, Sunday = 0
/// assert_eq!(noon.month0(), 5); // June, January = 0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    at: DateTime<FixedOffset>,
}

impl ClockSample {
    /// Wraps any timezone-aware instant.
    pub fn new<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
        Self {
            at: at.fixed_offset(),
        }
    }

    /// Samples the local wall clock.
    pub fn now() -> Self {
        Self::new(Local::now())
    }

    /// Builds a UTC sample from calendar fields, `None` if they do not form a valid date.
    pub fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self::new)
    }

    /// Hour of day, 0..=23.
    pub fn hour(&self) -> u32 {
        self.at.hour()
    }

    /// Day of week with Sunday = 0.
    pub fn weekday(&self) -> u32 {
        self.at.weekday().num_days_from_sunday()
    }

    /// Zero-based month, January = 0.
    pub fn month0(&self) -> u32 {
        self.at.month0()
    }

    /// Milliseconds since the Unix epoch, the continuous input of the oscillating terms.
    pub fn epoch_millis(&self) -> f64 {
        self.at.timestamp_millis() as f64
    }

    /// Underlying instant.
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.at
    }

    /// ISO-8601 UTC timestamp with millisecond precision.
    pub fn timestamp_iso(&self) -> String {
        self.at
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// 12-hour clock label such as `02:00 PM`.
    pub fn time_label(&self) -> String {
        self.at.format("%I:%M %p").to_string()
    }

    /// Returns the sample `hours` later, keeping the same offset.
    pub fn plus_hours(&self, hours: i64) -> Self {
        self.plus(Duration::hours(hours))
    }

    /// Returns the sample shifted by `delta`.
    pub fn plus(&self, delta: Duration) -> Self {
        Self {
            at: self.at + delta,
        }
    }
}

/// Iterates clock samples at a fixed cadence.
///
/// Mirrors a dashboard polling loop: `total` samples spaced `interval` apart.
///
/// ```
/// use chrono::Duration;
/// use microgrid_sim::sim::clock::{ClockSample, SampleClock};
///
/// let start = ClockSample::utc(2024, 1, 1, 0, 0, 0).unwrap();
/// let mut clock = SampleClock::new(start, Duration::seconds(5), 3);
/// let mut seconds = Vec::new();
/// clock.run(|s| seconds.push(s.epoch_millis() as i64 / 1000 % 60));
/// assert_eq!(seconds, vec![0, 5, 10]);
/// ```
pub struct SampleClock {
    start: ClockSample,
    interval: Duration,
    current: usize,
    total: usize,
}

impl SampleClock {
    /// Creates a clock producing `total` samples beginning at `start`.
    pub fn new(start: ClockSample, interval: Duration, total: usize) -> Self {
        Self {
            start,
            interval,
            current: 0,
            total,
        }
    }

    /// Returns the next sample, or `None` once `total` samples were produced.
    pub fn tick(&mut self) -> Option<ClockSample> {
        if self.current < self.total {
            let step = self.current as i32;
            self.current += 1;
            Some(self.start.plus(self.interval * step))
        } else {
            None
        }
    }

    /// Calls `f` for each remaining sample.
    pub fn run(&mut self, mut f: impl FnMut(ClockSample)) {
        while let Some(sample) = self.tick() {
            f(sample);
        }
    }
}
