//! Network seams used by the dashboard state machines.
//!
//! The dashboard never talks to `reqwest` directly: backend calls go through
//! [`Backend`] and identity calls through [`IdentityProvider`], so tests can
//! substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use gma_api_models::{
    DeleteAck, DoctorProfile, ProfileUpsert, TestRecord, TestSubmission, VideoRecord,
};
use gma_client::{
    ApiClient, ClientResult, FirebaseIdentity, IdentitySession, Page, ProgressFn, RefreshedToken,
    UploadSource,
};

/// Backend REST operations the dashboard depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// List the caller's videos.
    async fn list_videos(&self, token: &str, page: Page) -> ClientResult<Vec<VideoRecord>>;
    /// Upload one file, reporting percentage progress.
    async fn upload_video(
        &self,
        token: &str,
        source: &UploadSource,
        progress: ProgressFn,
    ) -> ClientResult<VideoRecord>;
    /// Delete one video.
    async fn delete_video(&self, token: &str, id: i64) -> ClientResult<DeleteAck>;
    /// Submit a blind test.
    async fn submit_test(&self, token: &str, submission: &TestSubmission)
    -> ClientResult<TestRecord>;
    /// Fetch every test the caller has submitted.
    async fn test_history(&self, token: &str) -> ClientResult<Vec<TestRecord>>;
    /// Fetch the backend profile; `None` when none exists yet.
    async fn get_profile(&self, token: &str) -> ClientResult<Option<DoctorProfile>>;
    /// Create or update the backend profile.
    async fn upsert_profile(&self, token: &str, body: &ProfileUpsert)
    -> ClientResult<DoctorProfile>;
}

/// Shared reference to the backend.
pub type SharedBackend = Arc<dyn Backend>;

#[async_trait]
impl Backend for ApiClient {
    async fn list_videos(&self, token: &str, page: Page) -> ClientResult<Vec<VideoRecord>> {
        Self::list_videos(self, token, page).await
    }

    async fn upload_video(
        &self,
        token: &str,
        source: &UploadSource,
        progress: ProgressFn,
    ) -> ClientResult<VideoRecord> {
        Self::upload_video(self, token, source, progress).await
    }

    async fn delete_video(&self, token: &str, id: i64) -> ClientResult<DeleteAck> {
        Self::delete_video(self, token, id).await
    }

    async fn submit_test(
        &self,
        token: &str,
        submission: &TestSubmission,
    ) -> ClientResult<TestRecord> {
        Self::submit_test(self, token, submission).await
    }

    async fn test_history(&self, token: &str) -> ClientResult<Vec<TestRecord>> {
        Self::test_history(self, token).await
    }

    async fn get_profile(&self, token: &str) -> ClientResult<Option<DoctorProfile>> {
        Self::get_profile(self, token).await
    }

    async fn upsert_profile(
        &self,
        token: &str,
        body: &ProfileUpsert,
    ) -> ClientResult<DoctorProfile> {
        Self::upsert_profile(self, token, body).await
    }
}

/// Identity provider operations the session gate depends on.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Email and password sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<IdentitySession>;
    /// Email and password account creation.
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<IdentitySession>;
    /// Federated sign-in with a provider-issued ID token.
    async fn sign_in_with_provider(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> ClientResult<IdentitySession>;
    /// Mint a fresh bearer token for `session`.
    async fn fresh_token(&self, session: &IdentitySession) -> ClientResult<RefreshedToken>;
}

/// Shared reference to the identity provider.
pub type SharedIdentity = Arc<dyn IdentityProvider>;

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<IdentitySession> {
        self.sign_in_with_password(email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<IdentitySession> {
        Self::sign_up(self, email, password).await
    }

    async fn sign_in_with_provider(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> ClientResult<IdentitySession> {
        self.sign_in_with_idp(provider_id, provider_token).await
    }

    async fn fresh_token(&self, session: &IdentitySession) -> ClientResult<RefreshedToken> {
        self.refresh(session.refresh_token()).await
    }
}

/// In-memory fakes shared by the crate's tests.
#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::Notify;

    use gma_api_models::{TestStatus, VideoStatus};
    use gma_client::ClientError;

    use super::*;

    pub(crate) fn video(id: i64, name: &str, size: u64) -> VideoRecord {
        VideoRecord {
            id,
            filename: format!("stored_{name}"),
            original_filename: name.to_string(),
            file_size: size,
            status: VideoStatus::Uploaded,
            created_at: None,
            file_url: None,
            classification: None,
            confidence: None,
        }
    }

    pub(crate) fn test_record(id: i64, results: Option<&str>) -> TestRecord {
        TestRecord {
            id,
            test_type: gma_api_models::TestType::Full,
            submitted_at: chrono::DateTime::from_timestamp(1_700_000_000 + id, 0)
                .unwrap_or_default(),
            status: TestStatus::Completed,
            results: results.map(str::to_string),
            video_ids: None,
        }
    }

    pub(crate) fn server_error(operation: &'static str) -> ClientError {
        ClientError::UnexpectedResponse {
            operation,
            reason: "injected failure",
        }
    }

    /// Backend fake with per-operation call counters and injectable failures.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub(crate) videos: Mutex<Vec<VideoRecord>>,
        pub(crate) history: Mutex<Vec<TestRecord>>,
        pub(crate) profile: Mutex<Option<DoctorProfile>>,
        pub(crate) failing_deletes: BTreeSet<i64>,
        pub(crate) failing_uploads: Mutex<BTreeSet<String>>,
        pub(crate) fail_history: bool,
        pub(crate) fail_profile_upsert: bool,
        pub(crate) tokens_seen: Mutex<Vec<String>>,
        pub(crate) calls: AtomicUsize,
        pub(crate) next_id: AtomicUsize,
        pub(crate) submissions: Mutex<Vec<TestSubmission>>,
        pub(crate) uploads: Mutex<BTreeMap<String, usize>>,
        /// Parks every upload at 50% until notified.
        pub(crate) upload_gate: Option<Arc<Notify>>,
    }

    impl FakeBackend {
        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self, token: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.tokens_seen.lock() {
                seen.push(token.to_string());
            }
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn list_videos(&self, token: &str, page: Page) -> ClientResult<Vec<VideoRecord>> {
            self.record(token);
            let videos = self.videos.lock().expect("videos lock");
            Ok(videos
                .iter()
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .cloned()
                .collect())
        }

        async fn upload_video(
            &self,
            token: &str,
            source: &UploadSource,
            mut progress: ProgressFn,
        ) -> ClientResult<VideoRecord> {
            self.record(token);
            *self
                .uploads
                .lock()
                .expect("uploads lock")
                .entry(source.file_name.clone())
                .or_default() += 1;
            progress(50);
            if let Some(gate) = &self.upload_gate {
                gate.notified().await;
            }
            let should_fail = self
                .failing_uploads
                .lock()
                .expect("failing lock")
                .contains(&source.file_name);
            if should_fail {
                return Err(server_error("uploads.create"));
            }
            progress(100);
            let id = i64::try_from(self.next_id.fetch_add(1, Ordering::SeqCst)).unwrap_or(0) + 100;
            Ok(video(id, &source.file_name, source.size))
        }

        async fn delete_video(&self, token: &str, id: i64) -> ClientResult<DeleteAck> {
            self.record(token);
            if self.failing_deletes.contains(&id) {
                return Err(server_error("uploads.delete"));
            }
            Ok(DeleteAck {
                message: format!("deleted {id}"),
            })
        }

        async fn submit_test(
            &self,
            token: &str,
            submission: &TestSubmission,
        ) -> ClientResult<TestRecord> {
            self.record(token);
            self.submissions
                .lock()
                .expect("submissions lock")
                .push(submission.clone());
            let mut record = test_record(42, None);
            record.test_type = submission.test_type;
            Ok(record)
        }

        async fn test_history(&self, token: &str) -> ClientResult<Vec<TestRecord>> {
            self.record(token);
            if self.fail_history {
                return Err(server_error("tests.history"));
            }
            Ok(self.history.lock().expect("history lock").clone())
        }

        async fn get_profile(&self, token: &str) -> ClientResult<Option<DoctorProfile>> {
            self.record(token);
            Ok(self.profile.lock().expect("profile lock").clone())
        }

        async fn upsert_profile(
            &self,
            token: &str,
            body: &ProfileUpsert,
        ) -> ClientResult<DoctorProfile> {
            self.record(token);
            if self.fail_profile_upsert {
                return Err(server_error("profile.upsert"));
            }
            let profile = DoctorProfile {
                id: 1,
                firebase_uid: "uid-1".into(),
                email: body.email.clone(),
                name: body.name.clone(),
                role: "doctor".into(),
                created_at: None,
            };
            *self.profile.lock().expect("profile lock") = Some(profile.clone());
            Ok(profile)
        }
    }

    /// Identity fake that accepts one password and counts token mints.
    #[derive(Default)]
    pub(crate) struct FakeIdentity {
        pub(crate) minted: AtomicUsize,
        pub(crate) reject_refresh: bool,
    }

    pub(crate) const PASSWORD: &str = "correct horse";

    fn session(email: &str) -> IdentitySession {
        IdentitySession::new(
            "uid-1",
            Some(email.to_string()),
            Some("Dr Test".into()),
            None,
            "refresh-0",
        )
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn sign_in(&self, email: &str, password: &str) -> ClientResult<IdentitySession> {
            if password == PASSWORD {
                Ok(session(email))
            } else {
                Err(ClientError::Identity {
                    code: "INVALID_PASSWORD".into(),
                    message: "Incorrect password",
                })
            }
        }

        async fn sign_up(&self, email: &str, _password: &str) -> ClientResult<IdentitySession> {
            Ok(session(email))
        }

        async fn sign_in_with_provider(
            &self,
            _provider_id: &str,
            _provider_token: &str,
        ) -> ClientResult<IdentitySession> {
            Ok(session("social@example.test"))
        }

        async fn fresh_token(&self, session: &IdentitySession) -> ClientResult<RefreshedToken> {
            if self.reject_refresh {
                return Err(ClientError::Identity {
                    code: "TOKEN_EXPIRED".into(),
                    message: "Your session has expired, please sign in again",
                });
            }
            let serial = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(RefreshedToken {
                id_token: format!("token-{serial}"),
                refresh_token: format!("refresh-{serial}"),
                user_id: if session.uid.is_empty() {
                    "uid-1".to_string()
                } else {
                    session.uid.clone()
                },
            })
        }
    }
}
