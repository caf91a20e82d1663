use std::sync::Arc;

use avatar_context::config::CompressionConfig;
use avatar_context::{
    ChatMessage, ContextCompressor, ContextManager, ContextSystemConfig, ContextValidator,
    EmotionalAnalyzer, KeywordEmotionScorer,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SAMPLE_MESSAGES: &[&str] = &[
    "Hello! How are you today?",
    "I love jazz music and I just bought a new guitar",
    "Honestly I'm a bit stressed about my exam tomorrow",
    "Can you recommend a good album to relax with?",
    "That's perfect, thank you so much!",
];

fn conversation(len: usize) -> Vec<ChatMessage> {
    (0..len)
        .map(|i| {
            let text = SAMPLE_MESSAGES[i % SAMPLE_MESSAGES.len()];
            if i % 2 == 0 {
                ChatMessage::user(text)
            } else {
                ChatMessage::assistant(text)
            }
        })
        .collect()
}

fn bench_process_message(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let messages = conversation(20);

    c.bench_function("process_20_messages", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut manager = ContextManager::new(ContextSystemConfig::default());
                for message in &messages {
                    black_box(manager.process_message(message.clone()).await);
                }
            })
        })
    });

    c.bench_function("get_context_for_response_cached", |b| {
        let mut manager = ContextManager::new(ContextSystemConfig::default());
        rt.block_on(async {
            for message in &messages {
                manager.process_message(message.clone()).await;
            }
        });
        b.iter(|| rt.block_on(async { black_box(manager.get_context_for_response("jazz").await) }))
    });
}

fn bench_emotion(c: &mut Criterion) {
    let mut analyzer = EmotionalAnalyzer::new(
        Arc::new(KeywordEmotionScorer::default()),
        Default::default(),
    );

    c.bench_function("analyze_emotional_state", |b| {
        b.iter(|| {
            black_box(analyzer.analyze_emotional_state(
                black_box("I'm absolutely thrilled about this, thank you!"),
                None,
            ))
        })
    });
}

fn bench_compress_and_validate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut manager = ContextManager::new(ContextSystemConfig::default());
    let context = rt.block_on(async {
        let mut last = None;
        for message in conversation(20) {
            last = Some(manager.process_message(message).await);
        }
        last
    });
    let Some(context) = context else {
        return;
    };

    let compressor = ContextCompressor::new(
        CompressionConfig {
            compression_threshold: 1024,
            ..Default::default()
        },
        Arc::new(KeywordEmotionScorer::default()),
    );
    c.bench_function("compress_context", |b| {
        b.iter(|| black_box(compressor.compress_context(black_box(&context))))
    });

    let mut validator = ContextValidator::new(Default::default());
    c.bench_function("validate_context", |b| {
        b.iter(|| black_box(validator.validate_context(black_box(&context))))
    });
}

criterion_group!(
    benches,
    bench_process_message,
    bench_emotion,
    bench_compress_and_validate
);
criterion_main!(benches);
