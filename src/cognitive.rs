use crossterm::event::KeyCode;
use rand::Rng;

/// Which side of the parity prompt a key press claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Parity,
}

/// The one active keyboard task. Replaced wholesale on every resolution;
/// `created_at_ms` anchors its response-time measurement independently of
/// the pointer targets.
#[derive(Clone, Debug, PartialEq)]
pub struct CognitiveTask {
    pub prompt: String,
    pub answer: Answer,
    pub kind: TaskKind,
    pub created_at_ms: f64,
}

impl CognitiveTask {
    /// Draw a numeral in [0, 100); even maps to Right (D key), odd to Left
    /// (A key).
    pub fn generate<R: Rng>(rng: &mut R, now_ms: f64) -> Self {
        let num: u32 = rng.gen_range(0..100);
        Self {
            prompt: num.to_string(),
            answer: if num % 2 == 0 {
                Answer::Right
            } else {
                Answer::Left
            },
            kind: TaskKind::Parity,
            created_at_ms: now_ms,
        }
    }

    pub fn is_correct(&self, answer: Answer) -> bool {
        self.answer == answer
    }
}

/// Interpret a key press as a parity answer. Anything other than A/D is
/// input noise and maps to None.
pub fn answer_for_key(code: KeyCode) -> Option<Answer> {
    match code {
        KeyCode::Char('a') | KeyCode::Char('A') => Some(Answer::Left),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(Answer::Right),
        _ => None,
    }
}
