use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress bar style for the write and read passes of a diagnostic.
pub trait NamedProgress {
    /// Style with `name` left-aligned in front of the bar, e.g. `Pattern 55555555 read`.
    fn named_bar(name: &str) -> Self;
}

impl NamedProgress for ProgressStyle {
    fn named_bar(name: &str) -> Self {
        let fmt = format!(
            "{name:<31}{{wide_bar:40.cyan/blue}} {{pos:>7}}/{{len:<7}} strides [{{elapsed_precise}}] {{msg}}"
        );
        ProgressStyle::default_bar()
            .template(&fmt)
            .unwrap_or(ProgressStyle::default_bar())
    }
}

/// Adds a bar counting `strides` to `progress`, if progress output is enabled.
pub fn stride_bar(
    progress: Option<&MultiProgress>,
    name: &str,
    strides: usize,
) -> Option<ProgressBar> {
    progress.map(|p| {
        let bar = p.add(ProgressBar::new(strides as u64));
        bar.set_style(ProgressStyle::named_bar(name));
        bar
    })
}
