use indicatif::{ProgressBar, ProgressStyle};
use tickerboard_core::domain::ticker::TickerSymbol;
use tickerboard_core::fetch::progress::FetchProgress;

const TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} {msg}";

pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl FetchProgress for BarProgress {
    fn on_symbol(&self, position: usize, _total: usize, symbol: &TickerSymbol) {
        self.bar.set_position(position as u64);
        self.bar.set_message(format!("fetching: {symbol}"));
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}
