//! Messaging services - Conversazioni, messaggi con allegati, notifiche di messaggio e ricerca
//!
//! Tutte le rotte richiedono autenticazione; l'accesso a una conversazione è
//! limitato ai suoi partecipanti.

use crate::core::{AppError, AppState};
use crate::dtos::{
    ConversationDetailDTO, ConversationListQuery, CreateConversationDTO, LimitQuery,
    MessageDTO, MessageRowDTO, MessageSearchQuery, MuteDTO, NewAttachment, PageQuery,
    PageRequest, SendMessageForm, WsEventDTO,
};
use crate::entities::{Attachment, Conversation, ConversationType, MessageType, User};
use crate::repositories::Read;
use crate::services::notifier;
use axum::{
    Extension,
    body::Body,
    extract::{Json, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Dimensione massima di un singolo allegato
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_ATTACHMENTS: usize = 5;

lazy_static! {
    static ref ALLOWED_ATTACHMENT: Regex =
        Regex::new(r"jpeg|jpg|png|gif|pdf|doc|docx|txt|zip|rar").unwrap();
}

/// Estensione e MIME type devono entrambi rientrare nei formati ammessi
pub fn is_allowed_attachment(filename: &str, mime_type: &str) -> bool {
    let extension = FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match extension {
        Some(ext) => ALLOWED_ATTACHMENT.is_match(&ext) && ALLOWED_ATTACHMENT.is_match(mime_type),
        None => false,
    }
}

/// Nome su disco: `<millis>-<casuale><.ext>`, mai il nome scelto dal client
fn stored_filename(original: &str) -> String {
    let extension = FsPath::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}{}", Utc::now().timestamp_millis(), suffix, extension)
}

/// Allegato letto dal multipart ma non ancora scritto su disco
struct PendingUpload {
    original_filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

/// Legge il form `content`, `parentMessageId`, `attachments` validando ogni file
async fn read_message_form(
    mut multipart: Multipart,
) -> Result<(Option<String>, Option<i32>, Vec<PendingUpload>), AppError> {
    let mut content = None;
    let mut parent_message_id = None;
    let mut uploads = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "content" => content = Some(field.text().await?),
            "parentMessageId" => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    let id = raw
                        .trim()
                        .parse::<i32>()
                        .map_err(|_| AppError::bad_request("Invalid parentMessageId"))?;
                    parent_message_id = Some(id);
                }
            }
            "attachments" => {
                if uploads.len() >= MAX_ATTACHMENTS {
                    return Err(AppError::bad_request("Too many attachments")
                        .with_details(format!("At most {} files per message", MAX_ATTACHMENTS)));
                }
                let original_filename = field.file_name().unwrap_or("file").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !is_allowed_attachment(&original_filename, &mime_type) {
                    warn!("Rejected attachment {} ({})", original_filename, mime_type);
                    return Err(AppError::bad_request("File type not allowed").with_details(
                        "Allowed: jpeg, jpg, png, gif, pdf, doc, docx, txt, zip, rar",
                    ));
                }

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if bytes.len() + chunk.len() > MAX_ATTACHMENT_BYTES {
                        return Err(AppError::payload_too_large("File too large")
                            .with_details("Each attachment is limited to 10 MB"));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                uploads.push(PendingUpload {
                    original_filename,
                    mime_type,
                    bytes,
                });
            }
            other => debug!("Ignoring multipart field {}", other),
        }
    }

    Ok((content, parent_message_id, uploads))
}

/// Scrive gli allegati in `<upload_dir>/messages`
async fn store_uploads(
    upload_dir: &str,
    uploads: Vec<PendingUpload>,
) -> Result<Vec<NewAttachment>, AppError> {
    let dir = PathBuf::from(upload_dir).join("messages");
    tokio::fs::create_dir_all(&dir).await?;

    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let filename = stored_filename(&upload.original_filename);
        let path = dir.join(&filename);
        if let Err(e) = tokio::fs::write(&path, &upload.bytes).await {
            remove_files(&stored).await;
            return Err(e.into());
        }
        stored.push(NewAttachment {
            filename,
            original_filename: upload.original_filename,
            file_path: path.to_string_lossy().into_owned(),
            file_size: upload.bytes.len() as i64,
            mime_type: upload.mime_type,
        });
    }
    Ok(stored)
}

async fn remove_files(files: &[NewAttachment]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(&file.file_path).await {
            warn!("Failed to remove orphan upload {}: {:?}", file.file_path, e);
        }
    }
}

/// Raggruppa gli allegati per messaggio mantenendo l'ordine dei messaggi
fn attach(rows: Vec<MessageRowDTO>, attachments: Vec<Attachment>) -> Vec<MessageDTO> {
    let mut by_message: HashMap<i32, Vec<Attachment>> = HashMap::new();
    for attachment in attachments {
        by_message.entry(attachment.message_id).or_default().push(attachment);
    }
    rows.into_iter()
        .map(|message| MessageDTO {
            attachments: by_message.remove(&message.id).unwrap_or_default(),
            message,
        })
        .collect()
}

/// 404 se la conversazione non esiste, 403 se l'utente non ne fa parte
async fn ensure_participant(
    state: &AppState,
    conversation_id: i32,
    user_id: i32,
) -> Result<Conversation, AppError> {
    let conversation = state
        .conversation
        .read(&conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation not found"))?;
    if !state.conversation.is_participant(conversation_id, user_id).await? {
        warn!("User {} is not a participant of conversation {}", user_id, conversation_id);
        return Err(AppError::forbidden("Access to this conversation is not allowed"));
    }
    Ok(conversation)
}

// ************************* CONVERSAZIONI ************************* //

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.id))]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<ConversationListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit, 20, 100);
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (conversations, total) = state
        .conversation
        .list_for_user(current_user.id, search, page)
        .await?;

    Ok(Json(json!({
        "conversations": conversations,
        "pagination": page.pagination(total),
    })))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateConversationDTO>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validare partecipanti e messaggio iniziale
    // 2. Verificare che tutti i partecipanti esistano
    // 3. Conversazione, partecipanti, primo messaggio e notifiche in una transazione
    // 4. Dopo il commit notificare gli altri partecipanti
    if body.participants.is_empty() {
        return Err(AppError::bad_request("At least one participant is required"));
    }
    let initial_message = body.initial_message.trim();
    if initial_message.is_empty() {
        return Err(AppError::bad_request("Initial message is required"));
    }

    let members = body.members(current_user.id);
    let others = &members[1..];
    if others.is_empty() {
        return Err(AppError::bad_request("At least one participant is required")
            .with_details("You cannot start a conversation with yourself"));
    }
    if state.user.count_existing(others).await? != others.len() as i64 {
        return Err(AppError::bad_request("Unknown participants"));
    }

    let subject = body.subject_or_default().to_string();
    let conversation_type = ConversationType::for_member_count(members.len());

    let mut tx = state.pool.begin().await?;
    let conversation_id = state
        .conversation
        .insert(&mut tx, current_user.id, &subject, conversation_type)
        .await?;
    for member in &members {
        state
            .conversation
            .add_participant(&mut tx, conversation_id, *member)
            .await?;
    }
    let message_id = state
        .message
        .insert(
            &mut tx,
            conversation_id,
            current_user.id,
            initial_message,
            MessageType::Text,
            None,
        )
        .await?;
    for other in others {
        state
            .message
            .insert_notification(&mut tx, *other, message_id, conversation_id)
            .await?;
    }
    tx.commit().await?;

    info!(
        "Conversation {} created with {} members",
        conversation_id,
        members.len()
    );

    for other in others {
        notifier::notify_new_conversation(&state, &current_user, *other, conversation_id, &subject)
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Conversation created successfully",
            "conversationId": conversation_id,
        })),
    ))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
) -> Result<Json<ConversationDetailDTO>, AppError> {
    ensure_participant(&state, conversation_id, current_user.id).await?;
    let conversation = state
        .conversation
        .detail(conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation not found"))?;

    let participants = state.conversation.participants(conversation_id).await?;
    Ok(Json(ConversationDetailDTO {
        conversation,
        participants,
    }))
}

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.id))]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
    Query(params): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    ensure_participant(&state, conversation_id, current_user.id).await?;

    let page = PageRequest::new(params.page, params.limit, 50, 100);
    // pagina dal più recente, restituita in ordine cronologico
    let mut rows = state
        .message
        .page(conversation_id, current_user.id, page)
        .await?;
    rows.reverse();

    let ids: Vec<i32> = rows.iter().map(|m| m.id).collect();
    let attachments = state.message.attachments_for(&ids).await?;
    let messages = attach(rows, attachments);

    if !ids.is_empty() {
        state.message.mark_read(&ids, current_user.id).await?;
        state
            .conversation
            .touch_last_read(conversation_id, current_user.id)
            .await?;
    }

    Ok(Json(json!({
        "messages": messages,
        "pagination": { "page": page.page, "limit": page.limit },
    })))
}

#[instrument(skip(state, current_user, multipart), fields(user_id = %current_user.id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    // 1. Leggere e validare il form (contenuto, parent, allegati)
    // 2. Verificare partecipazione e parent nella stessa conversazione
    // 3. Salvare i file, poi messaggio, allegati, notifiche e updated_at in transazione
    // 4. Dopo il commit: notifiche utente (salvo mute) ed evento NewMessage ai connessi
    let (content, parent_message_id, uploads) = read_message_form(multipart).await?;

    let content = content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::bad_request("Message content is required"))?;

    ensure_participant(&state, conversation_id, current_user.id).await?;

    if let Some(parent_id) = parent_message_id {
        if !state.message.belongs_to(parent_id, conversation_id).await? {
            return Err(AppError::bad_request("Parent message not found in this conversation"));
        }
    }

    let form = SendMessageForm {
        content: Some(content),
        parent_message_id,
        attachments: store_uploads(&state.upload_dir, uploads).await?,
    };

    let (message_id, recipients) = match persist_message(&state, conversation_id, &current_user, &form).await {
        Ok(result) => result,
        Err(e) => {
            remove_files(&form.attachments).await;
            return Err(e);
        }
    };

    let content = form.content.as_deref().unwrap_or_default();
    for (recipient_id, is_muted) in &recipients {
        if *is_muted {
            debug!("Conversation muted by {}, notification skipped", recipient_id);
            continue;
        }
        notifier::notify_new_message(
            &state,
            &current_user,
            *recipient_id,
            conversation_id,
            message_id,
            content,
        )
        .await;
    }
    push_new_message(&state, message_id, current_user.id, &recipients).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Message sent successfully", "messageId": message_id })),
    ))
}

/// Transazione del messaggio; ritorna l'id e i destinatari con il loro flag mute
async fn persist_message(
    state: &AppState,
    conversation_id: i32,
    sender: &User,
    form: &SendMessageForm,
) -> Result<(i32, Vec<(i32, bool)>), AppError> {
    let mut tx = state.pool.begin().await?;
    let message_id = state
        .message
        .insert(
            &mut tx,
            conversation_id,
            sender.id,
            form.content.as_deref().unwrap_or_default(),
            form.message_type(),
            form.parent_message_id,
        )
        .await?;

    for attachment in &form.attachments {
        state
            .message
            .insert_attachment(&mut tx, message_id, attachment)
            .await?;
    }

    let others = state
        .conversation
        .other_participants(&mut tx, conversation_id, sender.id)
        .await?;
    for participant in &others {
        state
            .message
            .insert_notification(&mut tx, participant.user_id, message_id, conversation_id)
            .await?;
    }
    state.conversation.touch(&mut tx, conversation_id).await?;
    tx.commit().await?;

    info!(
        "Message {} sent with {} attachments",
        message_id,
        form.attachments.len()
    );
    Ok((
        message_id,
        others.iter().map(|p| (p.user_id, p.is_muted)).collect(),
    ))
}

/// Evento NewMessage ai destinatari connessi; gli errori vengono solo loggati
async fn push_new_message(state: &AppState, message_id: i32, sender_id: i32, recipients: &[(i32, bool)]) {
    if !recipients
        .iter()
        .any(|(id, _)| state.users_online.is_user_online(*id))
    {
        return;
    }

    let row = match state.message.row(message_id, sender_id).await {
        Ok(Some(row)) => row,
        Ok(None) => return,
        Err(e) => {
            error!("Failed to load message {} for push: {:?}", message_id, e);
            return;
        }
    };
    let attachments = match state.message.attachments_for(&[message_id]).await {
        Ok(attachments) => attachments,
        Err(e) => {
            error!("Failed to load attachments for push: {:?}", e);
            Vec::new()
        }
    };
    let mut event = MessageDTO {
        message: row,
        attachments,
    };
    event.message.is_read_by_user = false;

    for (recipient_id, _) in recipients {
        state
            .users_online
            .send_event_if_online(*recipient_id, WsEventDTO::NewMessage(event.clone()));
    }
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn mark_conversation_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    ensure_participant(&state, conversation_id, current_user.id).await?;
    let marked = state
        .message
        .mark_conversation_read(conversation_id, current_user.id)
        .await?;
    state
        .conversation
        .touch_last_read(conversation_id, current_user.id)
        .await?;
    Ok(Json(json!({ "message": "Conversation marked as read", "marked": marked })))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn mute_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(conversation_id): Path<i32>,
    Json(body): Json<MuteDTO>,
) -> Result<impl IntoResponse, AppError> {
    // la riga esiste solo per i partecipanti
    if state
        .conversation
        .participant(conversation_id, current_user.id)
        .await?
        .is_none()
    {
        return Err(AppError::forbidden("Access to this conversation is not allowed"));
    }
    state
        .conversation
        .set_muted(conversation_id, current_user.id, body.muted)
        .await?;
    Ok(Json(json!({
        "message": if body.muted { "Conversation muted" } else { "Conversation unmuted" },
        "muted": body.muted,
    })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let message = state
        .message
        .read(&message_id)
        .await?
        .filter(|m| !m.is_deleted)
        .ok_or_else(|| AppError::not_found("Message not found"))?;
    if message.sender_id != current_user.id {
        return Err(AppError::forbidden("Only the sender can delete this message"));
    }

    state.message.soft_delete(message_id, current_user.id).await?;
    Ok(Json(json!({ "message": "Message deleted" })))
}

// ************************* NOTIFICHE DI MESSAGGIO ************************* //

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.id))]
pub async fn list_message_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = i64::from(params.limit.unwrap_or(20).clamp(1, 100));
    let notifications = state.message.notifications(current_user.id, limit).await?;
    let unread_count = state.message.unread_notifications(current_user.id).await?;
    Ok(Json(json!({
        "notifications": notifications,
        "unreadCount": unread_count,
    })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn mark_message_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    if state
        .message
        .mark_notification_read(id, current_user.id)
        .await?
        == 0
    {
        return Err(AppError::not_found("Notification not found"));
    }
    Ok(Json(json!({ "message": "Notification marked as read" })))
}

// ************************* RICERCA E ALLEGATI ************************* //

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.id))]
pub async fn search_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<MessageSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let term = params.term().ok_or_else(|| {
        AppError::bad_request("Search term too short").with_details("Minimum 2 characters")
    })?;
    let page = PageRequest::new(params.page, params.limit, 20, 100);
    let results = state
        .message
        .search(current_user.id, term, params.conversation_id, page)
        .await?;

    Ok(Json(json!({
        "results": results,
        "pagination": { "page": page.page, "limit": page.limit },
    })))
}

/// Il nome originale finisce nell'header: niente virgolette né a capo
fn content_disposition(original_filename: &str) -> String {
    let safe: String = original_filename
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(attachment_id): Path<i32>,
) -> Result<Response, AppError> {
    let attachment = state
        .message
        .attachment_for_participant(attachment_id, current_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("File not found or access denied"))?;

    let bytes = match tokio::fs::read(&attachment.file_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Attachment {} missing on disk", attachment.id);
            return Err(AppError::not_found("Physical file not found"));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, attachment.mime_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&attachment.original_filename),
            ),
        ],
        Body::from(bytes),
    )
        .into_response())
}
