//! # wsd-core — Desambiguação de Sentido de Palavras (WSD)
//!
//! Este crate implementa a desambiguação de substantivos ambíguos com uma
//! rede neural sequencial treinada sobre janelas de contexto. Dado um
//! texto já tokenizado e etiquetado (por um colaborador externo), o motor
//! decide qual dos sentidos registrados cada substantivo ambíguo carrega —
//! "bank" margem de rio ou instituição financeira — e escreve o resultado
//! de volta nos tokens.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui por dois caminhos que compartilham o mesmo vocabulário e as
//! mesmas convenções de codificação:
//!
//! **Treino**
//! 1. [`vocab`]: o corpus `label:palavras` constrói o vocabulário
//!    palavra → id (ids densos a partir de 1; 0 é o preenchimento).
//! 2. [`encoder`]: as linhas viram lotes de sequências inteiras de
//!    comprimento fixo mais rótulos one-hot, em um fluxo infinito que relê
//!    o arquivo a cada passada.
//! 3. [`trainer`]: orquestra o [`classifier`] (embedding → LSTM → densa →
//!    softmax, via candle) e persiste o par modelo + vocabulário.
//!
//! **Inferência**
//! 1. [`engine`]: varre os tokens, agrupa os substantivos ambíguos em
//!    famílias e captura a janela de contexto de cada uma;
//! 2. As janelas são codificadas com o vocabulário congelado (palavras
//!    desconhecidas são descartadas) e seguem em um único lote para o
//!    classificador;
//! 3. [`labels`]: a linha de probabilidades é reduzida ao deslocamento do
//!    sentido dentro do grupo de classes da palavra.
//!
//! ## Exemplo de Uso
//!
//! ```rust,no_run
//! use wsd_core::{DisambiguationEngine, Token};
//!
//! # fn main() -> wsd_core::Result<()> {
//! // Carrega o modelo, o vocabulário pareado (<modelo>.v) e os rótulos.
//! let engine = DisambiguationEngine::load("combined-nnet.bin", "combined-ts.labels.txt")?;
//!
//! // Tokens vindos do etiquetador externo.
//! let mut tokens = vec![
//!     Token::new("the", "DT"),
//!     Token::new("bank", "NN"),
//!     Token::new("of", "IN"),
//!     Token::new("the", "DT"),
//!     Token::new("river", "NN"),
//! ];
//!
//! // Desambigua com janela de 25 tokens para cada lado.
//! engine.wsd(&mut tokens, 25)?;
//! for token in &tokens {
//!     if let Some(synid) = token.synid {
//!         println!("{} -> sentido {}", token.text, synid);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`engine`]: a fachada de inferência ([`DisambiguationEngine`]).
//! - [`trainer`]: orquestração do treino e persistência do par de
//!   artefatos.
//! - [`encoder`]: codificação de janelas e o fluxo de lotes.
//! - [`vocab`] e [`labels`]: o estado imutável compartilhado pelos dois
//!   caminhos.

pub mod classifier;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod labels;
pub mod settings;
pub mod token;
pub mod trainer;
pub mod vocab;

pub use classifier::{ClassifierConfig, SequenceClassifier};
pub use encoder::{BatchStream, EncodedBatch, TrainingSample};
pub use engine::{DisambiguationEngine, EvaluationReport, WsdRequest};
pub use error::{Result, WsdError};
pub use labels::{LabelEntry, LabelRegistry, MAX_SENSES};
pub use settings::Settings;
pub use token::Token;
pub use trainer::{vocab_path_for, Trainer, TrainingOptions};
pub use vocab::Vocabulary;
