//! Arithmetic challenge generation

use chrono::{DateTime, Utc};

use crate::domain::entities::Challenge;

/// Draw two operands from `min..=max` and either add them or subtract the
/// smaller from the larger, so the answer is never negative
pub fn generate(min: i64, max: i64, now: DateTime<Utc>) -> Challenge {
    let a = platform::crypto::random_in_range(min, max);
    let b = platform::crypto::random_in_range(min, max);

    let (question, answer) = if platform::crypto::random_in_range(0, 1) == 0 {
        (format!("{a} + {b} = ?"), a + b)
    } else {
        let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
        (format!("{hi} - {lo} = ?"), hi - lo)
    };

    Challenge {
        question,
        answer,
        issued_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(question: &str) -> i64 {
        let parts: Vec<&str> = question.split_whitespace().collect();
        let a: i64 = parts[0].parse().unwrap();
        let b: i64 = parts[2].parse().unwrap();
        match parts[1] {
            "+" => a + b,
            "-" => a - b,
            op => panic!("unexpected operator {op}"),
        }
    }

    #[test]
    fn test_generated_answers_match_questions() {
        let now = Utc::now();
        for _ in 0..200 {
            let challenge = generate(1, 10, now);
            assert_eq!(solve(&challenge.question), challenge.answer);
            assert!(challenge.answer >= 0);
            assert!(challenge.answer <= 20);
            assert_eq!(challenge.issued_at, now);
        }
    }
}
