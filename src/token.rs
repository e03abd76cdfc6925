//! リクエストトークン
//!
//! 画像・気分の変更ごとに単調増加のトークンを発行し、
//! 最新トークンと一致するレスポンスだけを反映する。

/// 発行済みトークン
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// トークン発行器
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: u64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しいトークンを発行（以前のトークンはすべて古くなる）
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// 処理中のレスポンスをすべて無視対象にする
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_token_is_current() {
        let mut tokens = RequestTokens::new();
        let first = tokens.issue();
        assert!(tokens.is_current(first));

        let second = tokens.issue();
        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn test_invalidate_makes_pending_stale() {
        let mut tokens = RequestTokens::new();
        let token = tokens.issue();
        tokens.invalidate();
        assert!(!tokens.is_current(token));
    }
}
