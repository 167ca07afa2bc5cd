/// Peek/advance scanner over an argv slice.
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: &'a [String],
    position: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.position < self.tokens.len()
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    /// Consume and return the next token.
    pub fn advance(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    /// Zero-based index of the token `peek` would return.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.position)
    }
}
