//! Grading of single-select attempts and the running-average arithmetic
//! shared by quiz and user statistics.

use std::collections::HashSet;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AttemptAnswer, Quiz},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_index: u32,
    pub selected_option: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GradedAttempt {
    pub answers: Vec<AttemptAnswer>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: f64,
}

/// Grades `submitted` against the quiz answer key.
///
/// Every question is worth one point. Questions without an answer score
/// nothing; answering the same question twice or pointing outside the quiz
/// is rejected.
pub fn grade_attempt(quiz: &Quiz, submitted: &[SubmittedAnswer]) -> AppResult<GradedAttempt> {
    let mut seen = HashSet::with_capacity(submitted.len());
    let mut answers = Vec::with_capacity(submitted.len());
    let mut score: u32 = 0;

    for answer in submitted {
        let question = quiz
            .questions
            .get(answer.question_index as usize)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "questionIndex {} is out of range for a quiz with {} questions",
                    answer.question_index,
                    quiz.questions.len()
                ))
            })?;

        if !seen.insert(answer.question_index) {
            return Err(AppError::InvalidArgument(format!(
                "question {} was answered more than once",
                answer.question_index
            )));
        }

        let is_correct = question
            .is_correct_choice(answer.selected_option as usize)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "selectedOption {} is out of range for question {}",
                    answer.selected_option, answer.question_index
                ))
            })?;

        if is_correct {
            score += 1;
        }

        answers.push(AttemptAnswer {
            question_index: answer.question_index,
            selected_option: answer.selected_option,
            is_correct,
        });
    }

    let max_score = quiz.questions.len() as u32;

    Ok(GradedAttempt {
        answers,
        score,
        max_score,
        percentage: percentage(score, max_score),
    })
}

/// `score / max_score * 100`, clamped to [0, 100]. An empty quiz yields 0.
pub fn percentage(score: u32, max_score: u32) -> f64 {
    if max_score == 0 {
        return 0.0;
    }
    (f64::from(score) * 100.0 / f64::from(max_score)).clamp(0.0, 100.0)
}

/// Incrementally maintained mean: a count plus the mean of the values seen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunningAverage {
    pub count: i64,
    pub average: f64,
}

impl RunningAverage {
    pub fn new(count: i64, average: f64) -> Self {
        Self { count, average }
    }

    pub fn record(self, value: f64) -> Self {
        let prior = if self.count > 0 { self.average } else { 0.0 };
        let count = self.count.max(0) + 1;
        Self {
            count,
            average: (prior * (count - 1) as f64 + value) / count as f64,
        }
    }
}

/// Per-user aggregate: number of quizzes taken and the sum of their
/// percentages. The average is always derived from those two.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreTotals {
    pub quizzes_taken: i64,
    pub total_score: f64,
}

impl ScoreTotals {
    pub fn record(self, value: f64) -> Self {
        Self {
            quizzes_taken: self.quizzes_taken + 1,
            total_score: self.total_score + value,
        }
    }

    pub fn average(&self) -> f64 {
        if self.quizzes_taken > 0 {
            self.total_score / self.quizzes_taken as f64
        } else {
            0.0
        }
    }
}
