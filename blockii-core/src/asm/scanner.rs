/// Token stream for one source line with a single token of look-ahead.
///
/// Construction strips the comment (everything from the first `#`,
/// whitespace or not), upper-cases the rest and splits on whitespace.
/// Priming is lazy: neither the constructor nor an un-peeked scanner
/// touches the underlying token iterator.
pub struct TokenScanner {
    tokens: std::vec::IntoIter<String>,
    peeked: Option<String>,
}

impl TokenScanner {
    pub fn new(line: &str) -> TokenScanner {
        let line = match line.find('#') {
            Some(c) => &line[..c],
            None => line,
        };

        let tokens: Vec<String> = line
            .to_uppercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        TokenScanner {
            tokens: tokens.into_iter(),
            peeked: None,
        }
    }

    fn prime(&mut self) {
        if self.peeked.is_none() {
            self.peeked = self.tokens.next();
        }
    }

    pub fn peek(&mut self) -> Option<&str> {
        self.prime();
        self.peeked.as_deref()
    }

    pub fn consume(&mut self) -> Option<String> {
        self.prime();
        self.peeked.take()
    }
}
