//! Tests for PDF splitting

#[cfg(test)]
mod tests {
    use crate::error::{ErrorCategory, ErrorCode};
    use crate::operations::split::*;
    use crate::native::StructuralEngine;
    use crate::operations::test_env::env;
    use crate::operations::OperationOptions;
    use crate::progress::{CancellationToken, ProgressUpdate};
    use crate::test_helpers::{link_targets, source_pages, write_labelled_pdf, write_linked_pdf};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_split_range() {
        let dir = TempDir::new().unwrap();
        let source = write_labelled_pdf(dir.path(), "doc.pdf", 12);
        let output = dir.path().join("out").join("part.pdf");
        let (engine, env) = env();

        let written = split_pdf(&env, &source, "10-11, 1-3,7", &output, &OperationOptions::default())
            .unwrap();

        assert_eq!(written, output);
        assert_eq!(source_pages(&output), vec![1, 2, 3, 7, 10, 11]);
        assert_eq!(source_pages(&source).len(), 12);
        assert_eq!(engine.open_handles(), 0);
    }

    #[test]
    fn test_split_overlapping_ranges_collapse() {
        let dir = TempDir::new().unwrap();
        let source = write_labelled_pdf(dir.path(), "doc.pdf", 6);
        let output = dir.path().join("part.pdf");
        let (_engine, env) = env();

        split_pdf(&env, &source, "4-5,2-4,5", &output, &OperationOptions::default()).unwrap();
        assert_eq!(source_pages(&output), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_split_range_errors() {
        let dir = TempDir::new().unwrap();
        let source = write_labelled_pdf(dir.path(), "doc.pdf", 3);
        let output = dir.path().join("part.pdf");
        let (engine, env) = env();

        let error = split_pdf(&env, &source, "2-4", &output, &OperationOptions::default()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::PageOutOfRange);
        assert_eq!(error.category(), ErrorCategory::Validation);

        let error = split_pdf(&env, &source, "3-1", &output, &OperationOptions::default()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidPageRange);

        let error = split_pdf(&env, &source, "", &output, &OperationOptions::default()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidPageRange);

        assert!(!output.exists());
        assert_eq!(engine.open_handles(), 0);
    }

    #[test]
    fn test_split_into_chunks() {
        let dir = TempDir::new().unwrap();
        let source = write_labelled_pdf(dir.path(), "report.pdf", 5);
        let out_dir = dir.path().join("parts");
        let (engine, env) = env();

        let parts = split_into_chunks(&env, &source, 2, &out_dir, &OperationOptions::default()).unwrap();

        assert_eq!(
            parts,
            vec![
                out_dir.join("report_part_1.pdf"),
                out_dir.join("report_part_2.pdf"),
                out_dir.join("report_part_3.pdf"),
            ]
        );
        assert_eq!(source_pages(&parts[0]), vec![1, 2]);
        assert_eq!(source_pages(&parts[1]), vec![3, 4]);
        assert_eq!(source_pages(&parts[2]), vec![5]);
        assert_eq!(engine.open_handles(), 0);
    }

    #[test]
    fn test_split_into_chunks_cancel_removes_parts() {
        let dir = TempDir::new().unwrap();
        let source = write_labelled_pdf(dir.path(), "report.pdf", 4);
        let out_dir = dir.path().join("parts");
        let (engine, env) = env();

        let token = CancellationToken::new();
        let trigger = token.clone();
        let options = OperationOptions::default()
            .with_cancellation(token)
            .with_progress(move |update: &ProgressUpdate| {
                if update.stage == "splitting" && update.percentage > 50.0 {
                    trigger.cancel();
                }
            });

        let error = split_into_chunks(&env, &source, 1, &out_dir, &options).unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
        assert_eq!(engine.open_handles(), 0);

        let error = split_into_chunks(&env, &source, 0, &out_dir, &OperationOptions::default())
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_split_keeps_links_between_selected_pages() {
        let dir = TempDir::new().unwrap();
        let source = write_linked_pdf(dir.path(), "doc.pdf", 4, 2, 4);
        let (_engine, env) = env();

        let both = dir.path().join("both.pdf");
        split_pdf(&env, &source, "2-4", &both, &OperationOptions::default()).unwrap();
        assert_eq!(source_pages(&both), vec![2, 3, 4]);
        assert_eq!(link_targets(&both), vec![(2, Some(4), true)]);

        let dropped = dir.path().join("dropped.pdf");
        split_pdf(&env, &source, "1-2", &dropped, &OperationOptions::default()).unwrap();
        assert_eq!(source_pages(&dropped), vec![1, 2]);
        assert_eq!(link_targets(&dropped), vec![(2, None, true)]);
    }
}
