pub mod fixtures {
    use mongodb::bson::oid::ObjectId;

    use crate::auth::Claims;
    use crate::models::domain::{
        Difficulty, Quiz, QuizContent, QuizQuestion, QuizQuestionOption, User, UserRole,
    };

    /// Creates a standard test user
    pub fn test_user() -> User {
        User::new("testuser", "test@example.com", "not-a-real-hash")
    }

    pub fn test_admin() -> User {
        let mut user = User::new("admin", "admin@example.com", "not-a-real-hash");
        user.role = UserRole::Admin;
        user
    }

    pub fn claims_for(user: &User) -> Claims {
        Claims::new(user, 1)
    }

    /// A quiz whose question `i` has three options with the correct one at
    /// `correct[i]`.
    pub fn quiz_with_answer_key(correct: &[usize]) -> Quiz {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, &right)| QuizQuestion {
                text: format!("Question {}", i + 1),
                options: (0..3)
                    .map(|o| QuizQuestionOption {
                        text: format!("Option {}", o + 1),
                        is_correct: o == right,
                    })
                    .collect(),
            })
            .collect();

        Quiz::new(
            QuizContent {
                title: "Fixture quiz".to_string(),
                description: "Used in tests".to_string(),
                category: "testing".to_string(),
                difficulty: Difficulty::Easy,
                time_limit: 5,
                questions,
                is_published: true,
            },
            ObjectId::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixture_quiz_answer_key() {
        let quiz = quiz_with_answer_key(&[2, 0]);
        assert_eq!(quiz.total_questions(), 2);
        assert_eq!(quiz.questions[0].is_correct_choice(2), Some(true));
        assert_eq!(quiz.questions[1].is_correct_choice(1), Some(false));
    }

    #[test]
    fn test_fixture_users() {
        assert!(!test_user().is_admin());
        assert!(test_admin().is_admin());
        assert_eq!(claims_for(&test_user()).username, "testuser");
    }
}
