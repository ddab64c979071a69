use std::path::PathBuf;

use anyhow::anyhow;
use gma_client::{Page, UploadSource};
use gma_dashboard::{AcceptReport, Screen, UploadManager, status_counts};
use tracing::{info, warn};

use crate::cli::{UploadArgs, VideoDownloadArgs, VideoListArgs, VideoRemoveArgs, VideoRenameArgs};
use crate::client::{
    AppContext, CliError, CliResult, FULL_LISTING, classify_client, classify_dashboard, select_ids,
};
use crate::output::{
    UploadProgress, render_deletion, render_download, render_upload_report, render_video_list,
};

pub(crate) async fn handle_list(ctx: &mut AppContext, args: VideoListArgs) -> CliResult<()> {
    ctx.connect().await?;
    ctx.dashboard.router_mut().navigate(Screen::Manage);
    ctx.dashboard
        .refresh_videos(Page {
            skip: args.skip,
            limit: args.limit,
        })
        .await
        .map_err(|err| classify_dashboard(&err))?;

    let selection = ctx.dashboard.selection_mut();
    selection.set_sort(args.sort);
    if let Some(query) = args.search {
        selection.set_search(query);
    }
    let selection = ctx.dashboard.selection();
    let counts = status_counts(selection.videos());
    render_video_list(&selection.visible(), Some(&counts), ctx.format)
}

pub(crate) async fn handle_upload(ctx: &mut AppContext, args: UploadArgs) -> CliResult<()> {
    ctx.connect().await?;
    ctx.dashboard.router_mut().navigate(Screen::VideoUpload);
    let report = upload_with_retries(ctx, &args).await?;
    let uploads = ctx.dashboard.uploads();
    render_upload_report(&report, uploads.tasks(), ctx.format)?;
    upload_outcome(&report, &uploads)
}

/// Inspect, upload and retry the given files; returns the admission report.
pub(crate) async fn upload_with_retries(
    ctx: &mut AppContext,
    args: &UploadArgs,
) -> CliResult<AcceptReport> {
    let sources = inspect_files(&args.files).await?;
    let mut progress = UploadProgress::new(ctx.format);
    let (report, mut summary) = ctx
        .dashboard
        .upload_files(sources, |manager| progress.observe(manager))
        .await;
    let mut attempt = 0;
    while summary.failed > 0 && attempt < args.retries {
        attempt += 1;
        warn!(attempt, failed = summary.failed, "retrying failed uploads");
        summary = ctx
            .dashboard
            .retry_failed_uploads(|manager| progress.observe(manager))
            .await;
    }
    info!(
        started = report.started.len(),
        rejected = report.rejected.len(),
        "uploads settled"
    );
    Ok(report)
}

async fn inspect_files(files: &[PathBuf]) -> CliResult<Vec<UploadSource>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let source = UploadSource::inspect(path).await.map_err(|err| {
            CliError::validation(format!(
                "cannot read {}: {}",
                path.display(),
                err.user_message()
            ))
        })?;
        sources.push(source);
    }
    Ok(sources)
}

/// Exit status for a finished batch: rejected files are the caller's to fix,
/// failed transfers are operational.
pub(crate) fn upload_outcome(report: &AcceptReport, uploads: &UploadManager) -> CliResult<()> {
    if let Some(rejection) = report.rejected.first()
        && report.started.is_empty()
    {
        return Err(CliError::validation(format!(
            "{}: {}",
            rejection.file,
            rejection.reason.message()
        )));
    }
    let failed = uploads
        .tasks()
        .iter()
        .filter(|task| task.error_message().is_some())
        .count();
    if failed > 0 {
        return Err(CliError::failure(anyhow!("{failed} upload(s) failed")));
    }
    Ok(())
}

pub(crate) async fn handle_remove(ctx: &mut AppContext, args: VideoRemoveArgs) -> CliResult<()> {
    ctx.connect().await?;
    ctx.dashboard.router_mut().navigate(Screen::Manage);
    ctx.dashboard
        .refresh_videos(FULL_LISTING)
        .await
        .map_err(|err| classify_dashboard(&err))?;
    select_ids(ctx.dashboard.selection_mut(), &args.ids)?;

    let report = ctx
        .dashboard
        .delete_selected()
        .await
        .map_err(|err| classify_dashboard(&err))?;
    render_deletion(&report, ctx.format)?;
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(report.notice().message())))
    }
}

pub(crate) async fn handle_rename(ctx: &AppContext, args: VideoRenameArgs) -> CliResult<()> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(CliError::validation("new name must not be empty"));
    }
    ctx.connect().await?;
    let token = ctx
        .dashboard
        .session()
        .token()
        .await
        .map_err(|err| classify_dashboard(&err))?;
    let video = ctx
        .api
        .rename_video(&token, args.id, name)
        .await
        .map_err(|err| classify_client("uploads.update", err))?;
    render_video_list(&[&video], None, ctx.format)
}

pub(crate) async fn handle_download(ctx: &mut AppContext, args: VideoDownloadArgs) -> CliResult<()> {
    ctx.connect().await?;
    let fallback_name = match ctx.dashboard.refresh_videos(FULL_LISTING).await {
        Ok(_) => ctx
            .dashboard
            .selection()
            .videos()
            .iter()
            .find(|video| video.id == args.id)
            .map(|video| video.display_name().to_string()),
        Err(err) => {
            warn!(error = %err, "listing unavailable; using server file name");
            None
        }
    };
    let token = ctx
        .dashboard
        .session()
        .token()
        .await
        .map_err(|err| classify_dashboard(&err))?;
    let file = ctx
        .api
        .download_video(&token, args.id, &args.destination, fallback_name.as_deref())
        .await
        .map_err(|err| classify_client("uploads.download", err))?;
    render_download(&file, ctx.format)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::client::test_support::{context_for, mock_listing, mock_refresh, video_row};

    fn remove_args(ids: &[i64]) -> VideoRemoveArgs {
        VideoRemoveArgs { ids: ids.to_vec() }
    }

    #[tokio::test]
    async fn remove_deletes_each_selected_id() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_refresh(&server);
        mock_listing(
            &server,
            json!([video_row(1, "a.mp4", 10), video_row(2, "b.mp4", 20)]),
        );
        let delete_one = server.mock(|when, then| {
            when.method(DELETE).path("/api/uploads/1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"message": "deleted"}));
        });
        let delete_two = server.mock(|when, then| {
            when.method(DELETE).path("/api/uploads/2");
            then.status(200);
        });

        let mut ctx = context_for(&server);
        handle_remove(&mut ctx, remove_args(&[1]))
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        delete_one.assert();
        delete_two.assert_calls(0);
        let remaining: Vec<i64> = ctx
            .dashboard
            .selection()
            .videos()
            .iter()
            .map(|video| video.id)
            .collect();
        assert_eq!(remaining, vec![2]);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_is_rejected_before_any_delete() {
        let server = MockServer::start_async().await;
        mock_refresh(&server);
        mock_listing(&server, json!([video_row(1, "a.mp4", 10)]));
        let delete = server.mock(|when, then| {
            when.method(DELETE);
            then.status(200);
        });

        let mut ctx = context_for(&server);
        let err = handle_remove(&mut ctx, remove_args(&[1, 9]))
            .await
            .expect_err("unknown id");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "video 9 not found");
        delete.assert_calls(0);
    }

    #[tokio::test]
    async fn failed_delete_of_every_id_is_a_failure() {
        let server = MockServer::start_async().await;
        mock_refresh(&server);
        mock_listing(&server, json!([video_row(1, "a.mp4", 10)]));
        server.mock(|when, then| {
            when.method(DELETE).path("/api/uploads/1");
            then.status(500);
        });

        let mut ctx = context_for(&server);
        let err = handle_remove(&mut ctx, remove_args(&[1]))
            .await
            .expect_err("nothing deleted");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().starts_with("No videos were deleted"));
    }

    #[tokio::test]
    async fn upload_posts_accepted_files_and_skips_rejected_batches() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_refresh(&server);
        let create = server.mock(|when, then| {
            when.method(POST).path("/api/uploads/");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(video_row(31, "clip.mp4", 5));
        });

        let dir = tempfile::tempdir()?;
        let clip = dir.path().join("clip.mp4");
        std::fs::File::create(&clip)?.write_all(b"video")?;
        let notes = dir.path().join("notes.txt");
        std::fs::File::create(&notes)?.write_all(b"text")?;

        let mut ctx = context_for(&server);
        let report = upload_with_retries(
            &mut ctx,
            &UploadArgs {
                files: vec![clip],
                retries: 0,
            },
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        create.assert();
        let uploads = ctx.dashboard.uploads();
        assert_eq!(uploads.successful_backend_ids(), vec![31]);
        assert!(upload_outcome(&report, &uploads).is_ok());

        let rejected = upload_with_retries(
            &mut ctx,
            &UploadArgs {
                files: vec![notes],
                retries: 0,
            },
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        create.assert_calls(1);
        let err = upload_outcome(&rejected, &ctx.dashboard.uploads()).expect_err("rejected");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("Only MP4 and MOV files are supported"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_a_validation_error() {
        let err = inspect_files(&[PathBuf::from("/nonexistent/clip.mp4")])
            .await
            .expect_err("missing file");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().starts_with("cannot read /nonexistent/clip.mp4"));
    }

    #[tokio::test]
    async fn blank_rename_never_reaches_the_backend() {
        let server = MockServer::start_async().await;
        let refresh = mock_refresh(&server);
        let ctx = context_for(&server);
        let err = handle_rename(
            &ctx,
            VideoRenameArgs {
                id: 1,
                name: "   ".into(),
            },
        )
        .await
        .expect_err("blank name");
        assert_eq!(err.exit_code(), 2);
        refresh.assert_calls(0);
    }

    #[tokio::test]
    async fn download_uses_listed_name_as_fallback() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_refresh(&server);
        mock_listing(&server, json!([video_row(8, "scan.mov", 11)]));
        server.mock(|when, then| {
            when.method(GET).path("/api/uploads/8/download");
            then.status(200).body("video-bytes");
        });

        let dir = tempfile::tempdir()?;
        let mut ctx = context_for(&server);
        handle_download(
            &mut ctx,
            VideoDownloadArgs {
                id: 8,
                destination: dir.path().to_path_buf(),
            },
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(std::fs::read(dir.path().join("scan.mov"))?, b"video-bytes");
        Ok(())
    }
}
