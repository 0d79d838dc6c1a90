//! # Orquestração do Treino
//!
//! O treinador liga as pontas: dimensiona o classificador a partir do
//! vocabulário, alimenta-o com o fluxo infinito de lotes do corpus e, ao
//! final, persiste o par modelo + vocabulário.
//!
//! ## Fluxo Típico
//!
//! 1. Construir (ou carregar) o vocabulário do corpus;
//! 2. `Trainer::train`: o vocabulário ainda pode crescer durante a
//!    codificação dos lotes;
//! 3. `Trainer::save_model`: grava o artefato em `caminho` e o
//!    vocabulário em `caminho.v`. Os dois arquivos formam uma unidade: a
//!    implantação atômica do par é responsabilidade de quem publica os
//!    artefatos.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{ClassifierConfig, SequenceClassifier, DEFAULT_DROPOUT};
use crate::encoder::{BatchStream, DEFAULT_BATCH_SIZE, DEFAULT_MAX_SENTENCE_LEN};
use crate::error::{Result, WsdError};
use crate::settings::Settings;
use crate::vocab::Vocabulary;

/// Hiperparâmetros de uma rodada de treino.
///
/// `num_outputs` e `num_samples` não têm valor padrão sensato: devem ser
/// derivados do arquivo de rótulos e da contagem de amostras do corpus.
/// O chamador deve arredondar `num_samples` para baixo até um múltiplo de
/// `batch_size`; um lote final parcial nunca é processado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Número de classes de saída da rede.
    pub num_outputs: usize,
    /// Amostras consumidas por época.
    pub num_samples: usize,
    /// Tamanho do lote.
    pub batch_size: usize,
    /// Comprimento fixo das sequências.
    pub max_sentence_len: usize,
    /// Taxa de aprendizado.
    pub learning_rate: f64,
    /// Número de épocas.
    pub epochs: usize,
    /// Dimensão do embedding/estado oculto.
    pub hidden_layer_size: usize,
}

impl TrainingOptions {
    /// Opções com os padrões usuais para tudo além de `num_outputs` e
    /// `num_samples`.
    pub fn new(num_outputs: usize, num_samples: usize) -> Self {
        Self {
            num_outputs,
            num_samples,
            ..Self::default()
        }
    }

    /// Lê as opções de um armazém de configurações, mantendo o padrão para
    /// as chaves ausentes.
    ///
    /// Chaves reconhecidas: `numOutputs`, `numSamples`, `batchSize`,
    /// `maxSentenceLen`, `learningRate`, `epochs`, `hiddenLayerSize`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut options = Self::default();
        if let Some(v) = settings.get_parsed::<usize>("numOutputs")? {
            options.num_outputs = v;
        }
        if let Some(v) = settings.get_parsed::<usize>("numSamples")? {
            options.num_samples = v;
        }
        if let Some(v) = settings.get_parsed::<usize>("batchSize")? {
            options.batch_size = v;
        }
        if let Some(v) = settings.get_parsed::<usize>("maxSentenceLen")? {
            options.max_sentence_len = v;
        }
        if let Some(v) = settings.get_parsed::<f64>("learningRate")? {
            options.learning_rate = v;
        }
        if let Some(v) = settings.get_parsed::<usize>("epochs")? {
            options.epochs = v;
        }
        if let Some(v) = settings.get_parsed::<usize>("hiddenLayerSize")? {
            options.hidden_layer_size = v;
        }
        Ok(options)
    }
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            num_outputs: 0,
            num_samples: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            max_sentence_len: DEFAULT_MAX_SENTENCE_LEN,
            learning_rate: 0.01,
            epochs: 1,
            hidden_layer_size: 100,
        }
    }
}

/// Caminho do vocabulário pareado a um artefato de modelo: o mesmo caminho
/// com o sufixo `.v`.
pub fn vocab_path_for(model_path: impl AsRef<Path>) -> PathBuf {
    let mut os: OsString = model_path.as_ref().as_os_str().to_os_string();
    os.push(".v");
    PathBuf::from(os)
}

/// Orquestrador de treino: constrói o classificador, dirige as épocas e
/// persiste o resultado.
#[derive(Default)]
pub struct Trainer {
    classifier: Option<SequenceClassifier>,
}

impl Trainer {
    /// Cria um treinador sem modelo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treina um classificador sobre o corpus.
    ///
    /// O vocabulário compartilhado dimensiona a camada de embedding
    /// (`max_id() + 1`) e continua crescendo conforme palavras novas
    /// aparecem nos lotes. Cada época consome
    /// `num_samples / batch_size` lotes completos.
    pub fn train(
        &mut self,
        corpus_file: impl AsRef<Path>,
        vocab: &mut Vocabulary,
        options: &TrainingOptions,
    ) -> Result<()> {
        let corpus_file = corpus_file.as_ref();
        if vocab.is_empty() {
            return Err(WsdError::InvalidInput(
                "vocabulário vazio: construa-o do corpus antes do treino".to_string(),
            ));
        }
        let steps_per_epoch = options.num_samples / options.batch_size;
        if steps_per_epoch == 0 {
            return Err(WsdError::InvalidInput(format!(
                "num_samples ({}) menor que o tamanho do lote ({})",
                options.num_samples, options.batch_size
            )));
        }

        let max_features = vocab.max_id() as usize + 1;
        info!(
            palavras = vocab.len(),
            max_features, "construindo o modelo"
        );
        let config = ClassifierConfig {
            max_features,
            hidden_size: options.hidden_layer_size,
            num_classes: options.num_outputs,
            max_sentence_len: options.max_sentence_len,
            learning_rate: options.learning_rate,
            dropout: DEFAULT_DROPOUT,
        };
        let mut classifier = SequenceClassifier::new(config)?;
        let mut stream = BatchStream::new(
            corpus_file,
            options.num_outputs,
            options.batch_size,
            options.max_sentence_len,
        );

        info!(
            corpus = %corpus_file.display(),
            epocas = options.epochs,
            lotes_por_epoca = steps_per_epoch,
            "treinando o modelo"
        );
        classifier.fit(&mut stream, vocab, steps_per_epoch, options.epochs)?;
        self.classifier = Some(classifier);
        Ok(())
    }

    /// Classificador treinado, se `train` já foi executado.
    pub fn classifier(&self) -> Option<&SequenceClassifier> {
        self.classifier.as_ref()
    }

    /// Consome o treinador devolvendo o classificador treinado.
    pub fn into_classifier(self) -> Option<SequenceClassifier> {
        self.classifier
    }

    /// Persiste o modelo em `path` e o vocabulário em `path.v`.
    ///
    /// Os dois arquivos são gravados em sequência, sem garantia de
    /// atomicidade do par — um artefato sem o seu vocabulário é inutilizável
    /// e a implantação conjunta fica a cargo do chamador.
    pub fn save_model(&self, path: impl AsRef<Path>, vocab: &Vocabulary) -> Result<()> {
        let path = path.as_ref();
        let classifier = self.classifier.as_ref().ok_or_else(|| {
            WsdError::InvalidInput("nenhum modelo treinado para salvar".to_string())
        })?;
        info!(caminho = %path.display(), "salvando modelo e vocabulário");
        classifier.save(path)?;
        vocab.save(vocab_path_for(path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocab_path_suffix_convention() {
        assert_eq!(
            vocab_path_for("modelos/combined-nnet.bin"),
            PathBuf::from("modelos/combined-nnet.bin.v")
        );
    }

    #[test]
    fn test_options_from_settings_with_defaults() {
        let settings = Settings::parse("batchSize = 8\nepochs = 3\nnumOutputs = 12\n");
        let options = TrainingOptions::from_settings(&settings).unwrap();
        assert_eq!(options.batch_size, 8);
        assert_eq!(options.epochs, 3);
        assert_eq!(options.num_outputs, 12);
        // Não especificados ficam no padrão.
        assert_eq!(options.max_sentence_len, DEFAULT_MAX_SENTENCE_LEN);
        assert_eq!(options.hidden_layer_size, 100);
    }

    #[test]
    fn test_train_rejects_empty_vocabulary() {
        let mut trainer = Trainer::new();
        let mut vocab = Vocabulary::new();
        let options = TrainingOptions::new(3, 8);
        let err = trainer
            .train("inexistente.txt", &mut vocab, &options)
            .unwrap_err();
        assert!(matches!(err, WsdError::InvalidInput(_)));
    }

    #[test]
    fn test_train_rejects_num_samples_below_batch() {
        let mut trainer = Trainer::new();
        let mut vocab = Vocabulary::new();
        vocab.lookup_or_assign("rio");
        let mut options = TrainingOptions::new(3, 2);
        options.batch_size = 16;
        let err = trainer
            .train("inexistente.txt", &mut vocab, &options)
            .unwrap_err();
        assert!(matches!(err, WsdError::InvalidInput(_)));
    }

    #[test]
    fn test_save_without_training_fails() {
        let trainer = Trainer::new();
        let vocab = Vocabulary::new();
        let err = trainer.save_model("modelo.bin", &vocab).unwrap_err();
        assert!(matches!(err, WsdError::InvalidInput(_)));
    }

    #[test]
    fn test_train_and_save_model_pair() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(
            &corpus,
            "0:rio,margem,agua\n1:dinheiro,conta,juros\n2:rio,conta\n0:margem,rio\n",
        )
        .unwrap();

        let mut vocab = Vocabulary::build_from_corpus(&corpus).unwrap();
        let mut options = TrainingOptions::new(3, 4);
        options.batch_size = 2;
        options.max_sentence_len = 6;
        options.hidden_layer_size = 8;
        options.epochs = 1;

        let mut trainer = Trainer::new();
        trainer.train(&corpus, &mut vocab, &options).unwrap();
        assert!(trainer.classifier().is_some());

        let model_path = dir.path().join("model.bin");
        trainer.save_model(&model_path, &vocab).unwrap();
        assert!(model_path.exists());
        assert!(vocab_path_for(&model_path).exists());
    }
}
