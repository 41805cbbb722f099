use bytes::Bytes;
use futures_util::stream;
use hairvision_engine::{pump_lines, LineAssembler, PumpEnd};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const PAYLOAD: &str = "Loading model\n增强文件: /download/run_7_enhance.ply\n\n精细文件: /download/run_7_refine.ply\ndone";

fn assemble(chunks: &[&[u8]]) -> (Vec<String>, Option<String>) {
    let mut assembler = LineAssembler::new();
    let mut lines = Vec::new();
    for chunk in chunks {
        lines.extend(assembler.push(chunk));
    }
    (lines, assembler.finish())
}

#[test]
fn every_two_cut_split_yields_the_same_lines() {
    let bytes = PAYLOAD.as_bytes();
    let expected = assemble(&[bytes]);
    assert_eq!(
        expected.0,
        vec![
            "Loading model".to_string(),
            "增强文件: /download/run_7_enhance.ply".to_string(),
            String::new(),
            "精细文件: /download/run_7_refine.ply".to_string(),
        ]
    );
    assert_eq!(expected.1.as_deref(), Some("done"));

    for i in 0..=bytes.len() {
        for j in i..=bytes.len() {
            let got = assemble(&[&bytes[..i], &bytes[i..j], &bytes[j..]]);
            assert_eq!(got, expected, "split at {i}/{j}");
        }
    }
}

#[test]
fn lines_and_tail_reconstruct_the_input() {
    let bytes = PAYLOAD.as_bytes();
    let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
    let (lines, tail) = assemble(&single_bytes);
    let mut rebuilt: String = lines.iter().map(|line| format!("{line}\n")).collect();
    rebuilt.push_str(tail.as_deref().unwrap_or_default());
    assert_eq!(rebuilt, PAYLOAD);
}

#[test]
fn multibyte_character_split_across_chunks_is_not_mangled() {
    let line = "精细文件\n".as_bytes();
    let mut assembler = LineAssembler::new();
    assert!(assembler.push(&line[..1]).is_empty());
    assert!(assembler.push(&line[1..5]).is_empty());
    assert_eq!(assembler.push(&line[5..]), vec!["精细文件".to_string()]);
}

#[tokio::test]
async fn pump_flushes_unterminated_tail_at_end() {
    let body = stream::iter(vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
        Ok(Bytes::from_static(b"aa\nbb")),
    ]);
    let token = CancellationToken::new();
    let mut batches = Vec::new();
    let count = pump_lines(body, &token, |lines| batches.push(lines))
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        batches,
        vec![vec!["aaa".to_string()], vec!["bb".to_string()]]
    );
}

#[tokio::test]
async fn pump_stops_delivering_once_cancelled() {
    let body = stream::iter(vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"first\nsecond")),
        Ok(Bytes::from_static(b"\nthird\n")),
    ]);
    let token = CancellationToken::new();
    let mut batches = Vec::new();
    let result = pump_lines(body, &token, |lines| {
        batches.push(lines);
        token.cancel();
    })
    .await;
    assert_eq!(result, Err(PumpEnd::Cancelled));
    assert_eq!(batches, vec![vec!["first".to_string()]]);
}

#[tokio::test]
async fn pump_reports_read_errors() {
    let body = stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::other("connection reset")),
    ]);
    let token = CancellationToken::new();
    let result = pump_lines(body, &token, |_| {}).await;
    assert_eq!(result, Err(PumpEnd::Read("connection reset".to_string())));
}

#[test]
fn artifact_filenames_are_safe() {
    use hairvision_engine::artifact_filename;
    assert_eq!(artifact_filename("/download/run_7_enhance.ply"), "run_7_enhance.ply");
    assert_eq!(artifact_filename("/download/CON.ply"), "CON_.ply");
    assert_eq!(artifact_filename("/download/"), "download");
    assert_eq!(artifact_filename(""), "artifact.ply");
}
