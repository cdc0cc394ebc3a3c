use std::borrow::Cow;

/// Receives progress updates from long-running loops (pages, chapters, parts).
pub trait ProgressSink {
    fn set_len(&self, _len: u64) {}
    fn inc(&self, _n: u64) {}
    fn set_message(&self, _msg: Cow<'static, str>) {}
    fn finish(&self, _msg: Cow<'static, str>) {}
}

pub struct NullProgress;
impl ProgressSink for NullProgress {}

pub struct IndicatifProgress {
    pb: indicatif::ProgressBar,
}

impl IndicatifProgress {
    pub fn new(len: u64, prefix: impl Into<Cow<'static, str>>) -> Self {
        let pb = indicatif::ProgressBar::new(len);
        if let Ok(style) = indicatif::ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ) {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.set_prefix(prefix);
        Self { pb }
    }
}

impl ProgressSink for IndicatifProgress {
    fn set_len(&self, len: u64) { self.pb.set_length(len); }
    fn inc(&self, n: u64) { self.pb.inc(n); }
    fn set_message(&self, msg: Cow<'static, str>) { self.pb.set_message(msg); }
    fn finish(&self, msg: Cow<'static, str>) { self.pb.finish_with_message(msg); }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::Cell;

    /// Counts increments so tests can check per-item reporting.
    #[derive(Default)]
    pub struct CountingProgress {
        pub len: Cell<u64>,
        pub count: Cell<u64>,
        pub finished: Cell<bool>,
    }

    impl ProgressSink for CountingProgress {
        fn set_len(&self, len: u64) { self.len.set(len); }
        fn inc(&self, n: u64) { self.count.set(self.count.get() + n); }
        fn finish(&self, _msg: Cow<'static, str>) { self.finished.set(true); }
    }
}
