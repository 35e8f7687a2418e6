use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{authorize, is_allowed, Action, Claims, Resource},
    errors::{AppError, AppResult},
    models::{
        domain::{Quiz, QuizContent},
        dto::{
            quiz_dto::QuizDto,
            request::{parse_object_id, CreateQuizRequest, UpdateQuizRequest},
        },
    },
    repositories::{QuizRepository, UserRepository},
    services::lookups,
};

pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    users: Arc<dyn UserRepository>,
}

impl QuizService {
    pub fn new(quizzes: Arc<dyn QuizRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { quizzes, users }
    }

    pub async fn create_quiz(&self, actor: &Claims, request: CreateQuizRequest) -> AppResult<QuizDto> {
        request.validate()?;
        let creator = actor.user_id()?;

        let quiz = self
            .quizzes
            .create(Quiz::new(QuizContent::from(request), creator))
            .await?;

        log::info!("Quiz {} created by {}", quiz.id, actor.username);
        Ok(QuizDto::from_quiz(quiz, true, Some(actor.username.clone())))
    }

    /// Every quiz, newest first, with answer keys shown only where the caller
    /// may see them.
    pub async fn list_quizzes(&self, actor: Option<&Claims>) -> AppResult<Vec<QuizDto>> {
        let quizzes = self.quizzes.list_all().await?;
        self.to_dtos(actor, quizzes).await
    }

    pub async fn get_quiz(&self, actor: Option<&Claims>, id: &str) -> AppResult<QuizDto> {
        let quiz = self.load(id).await?;
        authorize(actor, Resource::Quiz(&quiz), Action::Read)?;

        let mut dtos = self.to_dtos(actor, vec![quiz]).await?;
        dtos.pop()
            .ok_or_else(|| AppError::InternalError("Quiz conversion produced no result".to_string()))
    }

    pub async fn update_quiz(
        &self,
        actor: &Claims,
        id: &str,
        request: UpdateQuizRequest,
    ) -> AppResult<QuizDto> {
        request.validate()?;
        let quiz = self.load(id).await?;
        authorize(Some(actor), Resource::Quiz(&quiz), Action::Update)?;

        let content = request.apply_to(&quiz);
        let updated = self
            .quizzes
            .update_content(&quiz.id, content)
            .await?
            .ok_or_else(|| not_found(id))?;

        log::info!("Quiz {} updated by {}", updated.id, actor.username);
        let creator_username = self.creator_username(&updated).await?;
        Ok(QuizDto::from_quiz(updated, true, creator_username))
    }

    /// Removes the quiz. Attempts made against it are kept.
    pub async fn delete_quiz(&self, actor: &Claims, id: &str) -> AppResult<()> {
        let quiz = self.load(id).await?;
        authorize(Some(actor), Resource::Quiz(&quiz), Action::Delete)?;

        if !self.quizzes.delete(&quiz.id).await? {
            return Err(not_found(id));
        }

        log::info!("Quiz {} deleted by {}", quiz.id, actor.username);
        Ok(())
    }

    /// The caller's own quizzes, drafts included.
    pub async fn my_quizzes(&self, actor: &Claims) -> AppResult<Vec<QuizDto>> {
        let quizzes = self
            .quizzes
            .list_by_creator(&actor.user_id()?, false)
            .await?;

        Ok(quizzes
            .into_iter()
            .map(|q| QuizDto::from_quiz(q, true, Some(actor.username.clone())))
            .collect())
    }

    /// Published quizzes of another user.
    pub async fn quizzes_by_user(
        &self,
        actor: Option<&Claims>,
        user_id: &str,
    ) -> AppResult<Vec<QuizDto>> {
        let creator = parse_object_id(user_id, "User")?;
        let quizzes = self.quizzes.list_by_creator(&creator, true).await?;
        self.to_dtos(actor, quizzes).await
    }

    async fn load(&self, id: &str) -> AppResult<Quiz> {
        let quiz_id = parse_object_id(id, "Quiz")?;
        self.quizzes
            .find_by_id(&quiz_id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn creator_username(&self, quiz: &Quiz) -> AppResult<Option<String>> {
        let user = self.users.find_by_id(&quiz.creator).await?;
        Ok(user.map(|u| u.username))
    }

    async fn to_dtos(&self, actor: Option<&Claims>, quizzes: Vec<Quiz>) -> AppResult<Vec<QuizDto>> {
        let names =
            lookups::usernames(self.users.as_ref(), quizzes.iter().map(|q| q.creator)).await?;

        Ok(quizzes
            .into_iter()
            .map(|quiz| {
                let reveal = is_allowed(actor, Resource::Quiz(&quiz), Action::ViewAnswerKey);
                let creator_username = names.get(&quiz.creator).cloned();
                QuizDto::from_quiz(quiz, reveal, creator_username)
            })
            .collect())
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Quiz with id '{}' not found", id))
}
