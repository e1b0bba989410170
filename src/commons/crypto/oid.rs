//! Object identifiers used by the CMS and SCEP codecs.
//!
//! All values are the DER encoded content octets of the identifier.

use bcder::Oid;

pub type ConstOid = Oid<&'static [u8]>;

//------------ PKCS#7 / CMS content types ------------------------------------

/// id-data: 1.2.840.113549.1.7.1
pub const DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// id-signedData: 1.2.840.113549.1.7.2
pub const SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// id-envelopedData: 1.2.840.113549.1.7.3
pub const ENVELOPED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 3]);

//------------ PKCS#9 attributes ---------------------------------------------

/// id-contentType: 1.2.840.113549.1.9.3
pub const CONTENT_TYPE: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);

/// id-messageDigest: 1.2.840.113549.1.9.4
pub const MESSAGE_DIGEST: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);

/// id-signingTime: 1.2.840.113549.1.9.5
pub const SIGNING_TIME: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 5]);

/// extensionRequest: 1.2.840.113549.1.9.14
pub const EXTENSION_REQUEST: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 14]);

//------------ Algorithms ----------------------------------------------------

/// id-sha256: 2.16.840.1.101.3.4.2.1
pub const SHA256: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);

/// rsaEncryption: 1.2.840.113549.1.1.1
pub const RSA_ENCRYPTION: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

/// sha256WithRSAEncryption: 1.2.840.113549.1.1.11
pub const SHA256_WITH_RSA_ENCRYPTION: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);

//------------ Certificate extensions ----------------------------------------

/// id-ce-subjectAltName: 2.5.29.17
pub const CE_SUBJECT_ALT_NAME: ConstOid = Oid(&[85, 29, 17]);

//------------ SCEP attributes -----------------------------------------------
//
// These live below the VeriSign arc 2.16.840.1.113733.1.9.

/// id-messageType: 2.16.840.1.113733.1.9.2
pub const SCEP_MESSAGE_TYPE: ConstOid = Oid(&[96, 134, 72, 1, 134, 248, 69, 1, 9, 2]);

/// id-pkiStatus: 2.16.840.1.113733.1.9.3
pub const SCEP_PKI_STATUS: ConstOid = Oid(&[96, 134, 72, 1, 134, 248, 69, 1, 9, 3]);

/// id-failInfo: 2.16.840.1.113733.1.9.4
pub const SCEP_FAIL_INFO: ConstOid = Oid(&[96, 134, 72, 1, 134, 248, 69, 1, 9, 4]);

/// id-senderNonce: 2.16.840.1.113733.1.9.5
pub const SCEP_SENDER_NONCE: ConstOid = Oid(&[96, 134, 72, 1, 134, 248, 69, 1, 9, 5]);

/// id-recipientNonce: 2.16.840.1.113733.1.9.6
pub const SCEP_RECIPIENT_NONCE: ConstOid = Oid(&[96, 134, 72, 1, 134, 248, 69, 1, 9, 6]);

/// id-transactionID: 2.16.840.1.113733.1.9.7
pub const SCEP_TRANSACTION_ID: ConstOid = Oid(&[96, 134, 72, 1, 134, 248, 69, 1, 9, 7]);

/// id-scep-failInfoText: 1.3.6.1.5.5.7.24.1
pub const SCEP_FAIL_INFO_TEXT: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 24, 1]);

//------------ Tests ---------------------------------------------------------
