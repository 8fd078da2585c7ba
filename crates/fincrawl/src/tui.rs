use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress for a batch of fetches: a total bar, plus success & failure counts.
///
/// Every bar is hidden when tracing is on, so the log lines aren't interleaved with redraws.
pub(crate) struct Progress {
    multi: Option<MultiProgress>,
    total: ProgressBar,
    success: ProgressBar,
    fails: ProgressBar,
}

impl Progress {
    pub(crate) fn new(len: usize, tui: bool) -> anyhow::Result<Self> {
        if !tui {
            return Ok(Self {
                multi: None,
                total: ProgressBar::hidden(),
                success: ProgressBar::hidden(),
                fails: ProgressBar::hidden(),
            });
        }

        // overall multi progress bar
        let multi = MultiProgress::new();

        // total number of fetches
        let total = multi.add(
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.magenta}\n \
                            {msg:>9.white} |{bar:57.white/grey}| {pos:<2} / {human_len} \
                            ({percent_precise}%) [Time: {elapsed}, ETA: {eta}]",
                    )?
                    .progress_chars("## "),
            ),
        );
        total.set_message("total");
        total.enable_steady_tick(Duration::from_millis(100));

        // successful fetches
        let success = multi.insert_after(
            &total,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.green} |{bar:57.green}| {pos:<2.green}")?
                    .progress_chars("## "),
            ),
        );
        success.set_message("successes");

        // failed fetches
        let fails = multi.insert_after(
            &success,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.red} |{bar:57.red}| {pos:<2.red}")?
                    .progress_chars("## "),
            ),
        );
        fails.set_message("failures");

        Ok(Self {
            multi: Some(multi),
            total,
            success,
            fails,
        })
    }

    /// A spinner naming the fetch in flight; hidden without a tui.
    pub(crate) fn spinner(&self, msg: String) -> ProgressBar {
        match &self.multi {
            Some(multi) => {
                let style = ProgressStyle::default_spinner()
                    .template("\t   > {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                multi.add(ProgressBar::new_spinner().with_message(msg).with_style(style))
            }
            None => ProgressBar::hidden(),
        }
    }

    pub(crate) fn record(&self, ok: bool) {
        self.total.inc(1);
        match ok {
            true => self.success.inc(1),
            false => self.fails.inc(1),
        }
    }

    pub(crate) fn finish(&self) {
        self.total.finish();
        self.success.finish();
        self.fails.finish();
    }
}
