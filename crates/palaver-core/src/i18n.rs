//! Localization catalog for user-visible engine strings.
//!
//! Every string the engine appends to a session (welcomes, usage errors,
//! provider-failure messages) resolves through this catalog. Pure lookup,
//! no I/O; the rendering layer handles everything else.

use serde::{Deserialize, Serialize};

use crate::types::Channel;

/// Supported interface languages. Spanish is the shipped default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Es,
    En,
}

/// Keys for every localized engine string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKey {
    WelcomeGeneral,
    WelcomeImageGenerator,
    WelcomeLiveVoice,
    WelcomeCodeReviewer,
    WelcomeImageEditor,
    InitializationError,
    ApiErrorPrefix,
    NoImageFromModel,
    UploadImageFirst,
    NoImageInResponse,
    TranslateUsage,
    ExplainUsage,
    SummarizeUsage,
    ImagineRedirect,
    UnknownCommandPrefix,
    LiveResponseErrorPrefix,
    FileUploadError,
    ImageLoaded,
}

/// Look up a catalog string.
pub fn text(lang: Language, key: MessageKey) -> &'static str {
    use MessageKey::*;
    match lang {
        Language::Es => match key {
            WelcomeGeneral => "¡Hola! ¿En qué puedo ayudarte hoy? Puedes usar comandos como `/traducir`, `/explicar`, o `/resumir`.",
            WelcomeImageGenerator => "Bienvenido al generador de imágenes. Escribe una descripción de la imagen que quieres crear.",
            WelcomeLiveVoice => "Bienvenido al canal de voz. Escribe algo y te responderé con voz.",
            WelcomeCodeReviewer => "Bienvenido al revisor de código. Pega un fragmento de código y te daré mi opinión.",
            WelcomeImageEditor => "Bienvenido al editor de imágenes. Sube una imagen para empezar a editarla con tus instrucciones.",
            InitializationError => "Error al inicializar. Por favor, verifica la configuración de tu clave de API y reinicia.",
            ApiErrorPrefix => "Lo siento, algo salió mal: ",
            NoImageFromModel => "No se recibió ninguna imagen del modelo. El prompt puede haber sido bloqueado por políticas de seguridad.",
            UploadImageFirst => "Por favor, sube una imagen primero usando el botón de adjuntar.",
            NoImageInResponse => "La respuesta de la IA no contenía una imagen. Puede que la solicitud haya sido bloqueada.",
            TranslateUsage => "Uso: /traducir [idioma] [texto a traducir]",
            ExplainUsage => "Uso: /explicar [concepto]",
            SummarizeUsage => "Uso: /resumir [URL o texto]",
            ImagineRedirect => "Para generar imágenes, por favor usa el canal #generar-imagenes.",
            UnknownCommandPrefix => "Comando desconocido: ",
            LiveResponseErrorPrefix => "Lo siento, algo salió mal en la respuesta de voz: ",
            FileUploadError => "No se pudo cargar la imagen.",
            ImageLoaded => "Imagen cargada. Ahora, dime qué cambios quieres hacer.",
        },
        Language::En => match key {
            WelcomeGeneral => "Hi! How can I help you today? You can use commands like `/translate`, `/explain`, or `/summarize`.",
            WelcomeImageGenerator => "Welcome to the image generator. Describe the image you want to create.",
            WelcomeLiveVoice => "Welcome to the voice channel. Type something and I'll respond with voice.",
            WelcomeCodeReviewer => "Welcome to the code reviewer. Paste a code snippet and I'll give you feedback.",
            WelcomeImageEditor => "Welcome to the image editor. Upload an image to start editing it with your instructions.",
            InitializationError => "Failed to initialize. Please check your API key configuration and restart.",
            ApiErrorPrefix => "Sorry, something went wrong: ",
            NoImageFromModel => "No image was received from the model. The prompt may have been blocked by safety policies.",
            UploadImageFirst => "Please upload an image first using the attach button.",
            NoImageInResponse => "The AI response did not contain an image. The request may have been blocked.",
            TranslateUsage => "Usage: /translate [language] [text to translate]",
            ExplainUsage => "Usage: /explain [concept]",
            SummarizeUsage => "Usage: /summarize [URL or text]",
            ImagineRedirect => "To generate images, please use the #image-generator channel.",
            UnknownCommandPrefix => "Unknown command: ",
            LiveResponseErrorPrefix => "Sorry, something went wrong in the voice response: ",
            FileUploadError => "Failed to upload the image.",
            ImageLoaded => "Image uploaded. Now, tell me what changes you want to make.",
        },
    }
}

/// Localized display name of a channel.
pub fn channel_name(lang: Language, channel: Channel) -> &'static str {
    match lang {
        Language::Es => match channel {
            Channel::General => "general",
            Channel::ImageGenerator => "generar-imagenes",
            Channel::LiveVoice => "voz-en-vivo",
            Channel::CodeReviewer => "revisor-de-codigo",
            Channel::ImageEditor => "editor-de-imagenes",
        },
        Language::En => match channel {
            Channel::General => "general",
            Channel::ImageGenerator => "image-generator",
            Channel::LiveVoice => "live-voice",
            Channel::CodeReviewer => "code-reviewer",
            Channel::ImageEditor => "image-editor",
        },
    }
}

/// The welcome message a channel's history is seeded with.
pub fn welcome(lang: Language, channel: Channel) -> &'static str {
    let key = match channel {
        Channel::General => MessageKey::WelcomeGeneral,
        Channel::ImageGenerator => MessageKey::WelcomeImageGenerator,
        Channel::LiveVoice => MessageKey::WelcomeLiveVoice,
        Channel::CodeReviewer => MessageKey::WelcomeCodeReviewer,
        Channel::ImageEditor => MessageKey::WelcomeImageEditor,
    };
    text(lang, key)
}
