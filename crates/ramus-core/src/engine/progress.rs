#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str, loglh: f64 },
    PhaseFinish,

    SprRound {
        iteration: u32,
        radius: usize,
        thorough: bool,
        loglh: f64,
    },
    NniRound {
        tolerance: f64,
        lh_epsilon: f64,
        loglh: f64,
    },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
