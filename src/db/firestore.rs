// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations on `users/{uid}`.

use crate::db::{collections, merge_field_paths, RemoteEvent, Subscription, SubscriptionHandle};
use crate::error::AppError;
use crate::models::UserDocument;
use tokio::sync::mpsc;

/// Listener target id for the per-user document. One listener is created per
/// subscription, so a fixed id is enough.
const USER_DOC_TARGET_ID: u32 = 1;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Document Operations ────────────────────────────────

    /// Get a user's document.
    pub async fn get_user_document(&self, uid: &str) -> Result<Option<UserDocument>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite a user's document.
    pub async fn set_user_document(&self, uid: &str, doc: &UserDocument) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update `habits` and the logged days in `doc`, leaving other fields and
    /// other days in place.
    ///
    /// Firestore upserts with an update mask, so this also creates the
    /// document when it does not exist yet.
    pub async fn merge_user_document(
        &self,
        uid: &str,
        doc: &UserDocument,
    ) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(merge_field_paths(doc))
            .in_col(collections::USERS)
            .document_id(uid)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Change Listener ─────────────────────────────────────────

    /// Listen for changes to a user's document.
    ///
    /// The listener only reports documents that exist, so the current state
    /// (including "absent") is read and delivered first.
    pub async fn listen_user_document(&self, uid: &str) -> Result<Subscription, AppError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let initial = self.get_user_document(uid).await?;
        let _ = tx.send(RemoteEvent::Snapshot(initial));

        let mut listener = self
            .client
            .create_listener(firestore::FirestoreMemListenStateStorage::new())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create listener: {}", e)))?;

        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .batch_listen([uid.to_string()])
            .add_target(
                firestore::FirestoreListenerTarget::new(USER_DOC_TARGET_ID),
                &mut listener,
            )
            .map_err(|e| AppError::Database(format!("Failed to add listen target: {}", e)))?;

        let listen_uid = uid.to_string();
        listener
            .start(move |event| {
                let tx = tx.clone();
                let uid = listen_uid.clone();
                async move {
                    match event {
                        firestore::FirestoreListenEvent::DocumentChange(ref change) => {
                            if let Some(doc) = &change.document {
                                let event = match firestore::FirestoreDb::deserialize_doc_to::<
                                    UserDocument,
                                >(doc)
                                {
                                    Ok(data) => RemoteEvent::Snapshot(Some(data)),
                                    Err(e) => {
                                        tracing::error!(uid = %uid, error = %e, "Undecodable user document");
                                        RemoteEvent::Error(e.to_string())
                                    }
                                };
                                let _ = tx.send(event);
                            }
                        }
                        firestore::FirestoreListenEvent::DocumentDelete(_)
                        | firestore::FirestoreListenEvent::DocumentRemove(_) => {
                            tracing::debug!(uid = %uid, "User document removed");
                            let _ = tx.send(RemoteEvent::Snapshot(None));
                        }
                        _ => {}
                    }
                    Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
                }
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to start listener: {}", e)))?;

        tracing::info!(uid, "Listening for user document changes");

        Ok(Subscription::new(
            rx,
            SubscriptionHandle::Firestore(Box::new(listener)),
        ))
    }
}
