use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::images::services::{ImageUpload, UploadHandler};
use crate::users::errors::{UserError, UserResult};
use crate::users::password::CredentialHasher;
use crate::users::repo::UserRepository;
use crate::users::repo_types::{User, UserUpdate};
use crate::users::validators::{
    is_valid_email, is_valid_name, is_valid_password, EMAIL_MSG, NAME_MSG, PASSWORD_MSG,
};

/// Use cases over the user record. Holds only injected handles; every
/// call is a short chain of awaited repository/hasher/storage steps.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
    uploads: UploadHandler,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: CredentialHasher,
        uploads: UploadHandler,
    ) -> Self {
        Self {
            repo,
            hasher,
            uploads,
        }
    }

    pub fn repository(&self) -> &Arc<dyn UserRepository> {
        &self.repo
    }

    #[instrument(skip(self, password))]
    pub async fn create(&self, name: &str, email: &str, password: &str) -> UserResult<User> {
        if !is_valid_name(name) {
            return Err(UserError::Validation(NAME_MSG));
        }
        if !is_valid_email(email) {
            return Err(UserError::Validation(EMAIL_MSG));
        }
        if !is_valid_password(password) {
            return Err(UserError::Validation(PASSWORD_MSG));
        }

        // Fast path only; the insert below is what enforces uniqueness.
        if self.repo.find_by_email(email).await?.is_some() {
            return Err(UserError::DuplicateKey);
        }

        let hash = self.hasher.hash(password).await?;
        let user = User::new(name.to_string(), email.to_string(), hash);
        self.repo.insert(&user).await?;

        info!(email = %user.email, "user created");
        Ok(user)
    }

    /// Absent fields are left untouched; with neither field set this is a
    /// successful no-op for an existing user.
    #[instrument(skip(self, password))]
    pub async fn edit(
        &self,
        email: &str,
        name: Option<&str>,
        password: Option<&str>,
    ) -> UserResult<User> {
        if email.is_empty() {
            return Err(UserError::Validation("Email is required."));
        }
        if let Some(name) = name {
            if !is_valid_name(name) {
                return Err(UserError::Validation(NAME_MSG));
            }
        }
        if let Some(password) = password {
            if !is_valid_password(password) {
                return Err(UserError::Validation(PASSWORD_MSG));
            }
        }

        let user = self
            .repo
            .find_by_email(email)
            .await?
            .ok_or(UserError::NotFound)?;

        if name.is_none() && password.is_none() {
            debug!(%email, "edit without changes");
            return Ok(user);
        }

        let password_hash = match password {
            Some(password) => Some(self.hasher.hash(password).await?),
            None => None,
        };
        let update = UserUpdate {
            name: name.map(str::to_string),
            password_hash,
            image_path: None,
        };
        let user = self.repo.update_existing(email, &update).await?;

        info!(%email, "user updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, email: &str) -> UserResult<()> {
        if self.repo.find_by_email(email).await?.is_none() {
            return Err(UserError::NotFound);
        }
        self.repo.delete_by_email(email).await?;

        info!(%email, "user deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> UserResult<Vec<User>> {
        Ok(self.repo.find_all().await?)
    }

    /// Stores the image and points the user's `image_path` at it. The type
    /// check and the lookup both happen before any bytes are written.
    #[instrument(skip(self, upload))]
    pub async fn attach_image(
        &self,
        email: &str,
        upload: Option<ImageUpload>,
    ) -> UserResult<String> {
        let upload = upload.ok_or(UserError::MissingUpload)?;
        self.uploads.check(&upload)?;

        if self.repo.find_by_email(email).await?.is_none() {
            return Err(UserError::NotFound);
        }

        let path = self.uploads.store(upload).await?;
        let update = UserUpdate {
            image_path: Some(path.clone()),
            ..Default::default()
        };
        if let Err(e) = self.repo.update_existing(email, &update).await {
            self.uploads.discard(&path).await;
            return Err(e.into());
        }

        info!(%email, %path, "image attached");
        Ok(path)
    }
}
