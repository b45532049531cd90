mod query_tests;

use std::sync::Arc;

use crate::assist::Assistant;
use crate::config::AssistConfig;
use crate::corpus::{InMemoryCorpus, Locale};
use crate::embeddings::EncoderConfig;
use crate::test_utils::{CountingFetcher, FakeRuntime, SAMPLE_TIPS_DE, SAMPLE_TIPS_EN};

pub(crate) fn sample_corpus() -> Arc<InMemoryCorpus> {
    let corpus = InMemoryCorpus::new()
        .with_json(Locale::De, SAMPLE_TIPS_DE)
        .and_then(|c| c.with_json(Locale::En, SAMPLE_TIPS_EN))
        .expect("sample corpora parse");
    Arc::new(corpus)
}

/// Assistant over the sample corpora with `runtime` and a model at `model_location`
pub(crate) fn assistant(
    runtime: Arc<FakeRuntime>,
    model_location: String,
    locale: Locale,
) -> Assistant {
    let mut config = AssistConfig::default().with_encoder(
        EncoderConfig::default()
            .with_model_location(model_location)
            .with_max_length(64),
    );
    config.locale = locale;

    Assistant::builder(config)
        .runtime(runtime)
        .fetcher(Arc::new(CountingFetcher::failing()))
        .corpus_source(sample_corpus())
        .build()
}
