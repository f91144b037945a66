use std::time::Duration;

/// Yields growing prefixes of `text`, one character longer each step.
pub struct TypingReveal<'a> {
    text: &'a str,
    shown: usize,
}

impl<'a> TypingReveal<'a> {
    pub fn new(text: &'a str) -> Self {
        TypingReveal { text, shown: 0 }
    }
}

impl<'a> Iterator for TypingReveal<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.text[self.shown..].chars().next()?;
        self.shown += next.len_utf8();
        Some(&self.text[..self.shown])
    }
}

/// Plays the reveal, waiting `delay` before every frame after the first.
pub async fn reveal<F>(text: &str, delay: Duration, mut frame: F)
where
    F: FnMut(&str),
{
    for (i, prefix) in TypingReveal::new(text).enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        frame(prefix);
    }
}
